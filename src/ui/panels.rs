//! Static text blocks: persona cards, result sections and the error alert.
//!
//! Everything here returns a `String` so callers can route it through
//! `MultiProgress::println` or plain stdout alike.

use console::style;
use textwrap::Options;

use crate::model::Persona;
use crate::presenter::markup::{self, Span};
use crate::presenter::ResultView;
use crate::ui::icons::{CROSS, HARMONY, JOURNEY, PERSONA, QUESTION, SPARKLE};

const MIN_WIDTH: usize = 40;
const FALLBACK_WIDTH: usize = 80;
const INDENT: &str = "  ";

/// Resolve the wrap width: `configured` when non-zero, else the terminal width.
pub fn wrap_width(configured: usize) -> usize {
    let width = if configured > 0 {
        configured
    } else {
        terminal_size::terminal_size()
            .map(|(terminal_size::Width(w), _)| w as usize)
            .unwrap_or(FALLBACK_WIDTH)
    };
    width.max(MIN_WIDTH)
}

fn indented(text: &str, width: usize) -> String {
    let options = Options::new(width)
        .initial_indent(INDENT)
        .subsequent_indent(INDENT);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                textwrap::fill(line, &options)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Titled block whose body is rendered from markup spans.
pub fn section(title: &str, body: &[Span], width: usize) -> String {
    format!(
        "{}\n{}",
        style(title).cyan().bold(),
        indented(&markup::render(body), width)
    )
}

fn section_text(title: &str, body: &str, width: usize) -> String {
    section(title, &markup::parse_bold(body), width)
}

/// One persona, as a short card.
pub fn persona_card(persona: &Persona, width: usize) -> String {
    let mut out = format!(
        "{}{} {}",
        PERSONA,
        style(&persona.name).yellow().bold(),
        style(format!("({})", persona.role)).dim()
    );
    if !persona.core_expertise.is_empty() {
        out.push('\n');
        out.push_str(&indented(
            &format!("Expertise: {}", persona.core_expertise.join(", ")),
            width,
        ));
    }
    if !persona.rationale.is_empty() {
        out.push('\n');
        out.push_str(&indented(&format!("Why: {}", persona.rationale), width));
    }
    out
}

/// The "Error" alert shown when a cycle fails.
pub fn error_alert(message: &str, width: usize) -> String {
    format!(
        "{}{}\n{}",
        CROSS,
        style("Error").red().bold(),
        indented(message, width)
    )
}

/// Headline shown while a fresh result is celebrated.
pub fn celebration(iteration: u32) -> String {
    format!(
        "{}{} {}",
        SPARKLE,
        style("Question refined!").green().bold(),
        style(format!("(iteration {})", iteration)).dim()
    )
}

/// Main result panels. Collapsed disclosures are only listed, not shown.
pub fn result_panels(view: &ResultView, width: usize) -> String {
    let mut blocks = vec![format!(
        "{}{}\n{}",
        QUESTION,
        style("Refined question").cyan().bold(),
        indented(&style(&view.improved_question).bold().to_string(), width)
    )];

    if view.rationale.is_revealed() {
        blocks.push(section("Why this question", view.rationale.reveal(), width));
    }
    if !view.final_answer.is_empty() {
        blocks.push(section_text("Answer", &view.final_answer, width));
    }
    if let Some(principle) = &view.harmony_principle {
        blocks.push(section_text(&format!("{}Harmony principle", HARMONY), principle, width));
    }
    if !view.summary.is_empty() {
        blocks.push(section_text(&format!("{}Journey", JOURNEY), &view.summary, width));
    }
    if !view.personas.is_empty() {
        let names: Vec<&str> = view.personas.iter().map(|p| p.name.as_str()).collect();
        blocks.push(format!(
            "{}\n{}",
            style("Personas consulted").cyan().bold(),
            indented(&names.join(", "), width)
        ));
    }
    if view.individual_answers.is_revealed() {
        blocks.push(section(
            "Individual answers",
            view.individual_answers.reveal(),
            width,
        ));
    }
    if view.new_dimensions.is_revealed() {
        blocks.push(section("New dimensions", view.new_dimensions.reveal(), width));
    }

    let hidden: Vec<&str> = [
        ("rationale", &view.rationale),
        ("individual answers", &view.individual_answers),
        ("new dimensions", &view.new_dimensions),
    ]
    .into_iter()
    .filter(|(_, d)| d.is_available() && !d.is_revealed())
    .map(|(name, _)| name)
    .collect();
    if !hidden.is_empty() {
        blocks.push(
            style(format!("More available: {}", hidden.join(", ")))
                .dim()
                .to_string(),
        );
    }

    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RefinementResult;
    use crate::session::{Session, SessionEvent};

    fn view() -> ResultView {
        let mut session = Session::new();
        session.reduce(SessionEvent::Submit {
            question: "What is happiness?".into(),
        });
        let cycle = session.cycle().unwrap();
        session.reduce(SessionEvent::PersonasSelected {
            cycle,
            personas: vec![
                Persona::new("Aristotle", "Philosopher"),
                Persona::new("Maslow", "Psychologist"),
            ],
        });
        let mut result = RefinementResult::new("What makes a life meaningful?");
        result.rationale = "Moves from feeling to **purpose**".into();
        result.final_answer = "A life of **virtue**".into();
        result.individual_answers = Some("**Aristotle**: eudaimonia".into());
        session.reduce(SessionEvent::ImprovementReady {
            cycle,
            result: Box::new(result),
        });
        ResultView::from_session(&session).unwrap()
    }

    #[test]
    fn test_configured_width_wins() {
        assert_eq!(wrap_width(100), 100);
        assert_eq!(wrap_width(10), MIN_WIDTH);
    }

    #[test]
    fn test_collapsed_sections_are_listed_not_shown() {
        console::set_colors_enabled(false);
        let out = result_panels(&view(), 80);
        assert!(out.contains("What makes a life meaningful?"));
        assert!(out.contains("A life of virtue"));
        assert!(out.contains("Aristotle, Maslow"));
        assert!(!out.contains("eudaimonia"));
        assert!(out.contains("More available: rationale, individual answers"));
        assert!(!out.contains("new dimensions"));
    }

    #[test]
    fn test_revealed_sections_are_shown() {
        console::set_colors_enabled(false);
        let view = view();
        view.rationale.reveal();
        view.individual_answers.reveal();
        let out = result_panels(&view, 80);
        assert!(out.contains("Moves from feeling to purpose"));
        assert!(out.contains("Aristotle: eudaimonia"));
        assert!(!out.contains("More available"));
    }

    #[test]
    fn test_error_alert_carries_message() {
        console::set_colors_enabled(false);
        let out = error_alert("An error occurred: HTTP error! status: 500", 80);
        assert!(out.contains("Error"));
        assert!(out.contains("An error occurred: HTTP error! status: 500"));
    }

    #[test]
    fn test_persona_card_wraps_within_width() {
        let persona = Persona::new("Aristotle", "Philosopher")
            .with_rationale("word ".repeat(40));
        let card = persona_card(&persona, 40);
        for line in card.lines().skip(1) {
            assert!(console::measure_text_width(line) <= 40);
        }
    }
}
