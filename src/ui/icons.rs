//! Shared UI icons and emojis.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Session indicators
pub static PERSONA: Emoji<'_, '_> = Emoji("👤 ", "-");
pub static THINKING: Emoji<'_, '_> = Emoji("🧠 ", "[..]");
pub static QUESTION: Emoji<'_, '_> = Emoji("❓ ", "?");
pub static HARMONY: Emoji<'_, '_> = Emoji("🎵 ", "~");
pub static JOURNEY: Emoji<'_, '_> = Emoji("🧭 ", ">");
