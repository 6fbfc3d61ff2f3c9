//! The fixed catalogue of progress stages shown while a cycle is processing.
//!
//! Stages are presentation metadata only: the backend reports no progress,
//! so nothing here corresponds to real backend work. The list is static and
//! immutable for the life of the process.

use serde::Serialize;

/// One named phase of the progress sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    /// Stable identifier (e.g. `"critique"`)
    pub key: &'static str,
    /// Short label shown next to the progress bar
    pub label: &'static str,
    /// One-line description shown under the label
    pub description: &'static str,
}

/// Number of stages in the catalogue.
pub const STAGE_COUNT: usize = 7;

static STAGES: [Stage; STAGE_COUNT] = [
    Stage {
        key: "brainstorm",
        label: "Brainstorming",
        description: "Each persona shares its first take on the question",
    },
    Stage {
        key: "critique",
        label: "Critiquing",
        description: "Personas challenge their own analysis and each other's",
    },
    Stage {
        key: "reflect",
        label: "Reflecting",
        description: "Perspectives are reassessed in light of the critiques",
    },
    Stage {
        key: "expand",
        label: "Expanding",
        description: "New ideas are woven into the network of thoughts",
    },
    Stage {
        key: "converge",
        label: "Converging",
        description: "Each persona settles on its strongest answer",
    },
    Stage {
        key: "synthesize",
        label: "Synthesizing",
        description: "Individual answers are merged into a collective one",
    },
    Stage {
        key: "refine",
        label: "Refining",
        description: "The original question is reformulated into a deeper one",
    },
];

/// All stages, in display order.
pub fn get_all_stages() -> &'static [Stage] {
    &STAGES
}

/// Stage at `index`, if any.
pub fn get_stage(index: usize) -> Option<&'static Stage> {
    STAGES.get(index)
}

/// Index of the final stage.
pub fn last_stage_index() -> usize {
    STAGE_COUNT - 1
}
