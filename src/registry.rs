//! Static model registry
//!
//! Maps the selectable model options to backend model identifiers and
//! display metadata. Two entries are virtual: "Comparison" fans out to
//! every concrete model, "Comparison Version" fans out across product
//! versions with a fixed backend model.

use colored::Color;

/// How a model option dispatches requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One call to a single backend model
    Single,
    /// One concurrent call per concrete model, all-or-nothing join
    Comparison,
    /// One concurrent call per product version, committed as each resolves
    ComparisonVersion,
}

/// A selectable model option with display metadata
#[derive(Debug)]
pub struct ModelOption {
    /// Stable identifier (e.g. "gpt-4.1-mini")
    pub id: &'static str,
    /// Display name shown in the UI and used as the message tag
    pub name: &'static str,
    /// Icon glyph
    pub icon: &'static str,
    /// Terminal color theme
    pub color: Color,
    /// Backend model identifier; empty for the pure fan-out option
    pub backend_id: &'static str,
    /// Short description
    pub description: &'static str,
    /// Dispatch strategy for this option
    pub mode: DispatchMode,
}

/// The full option table, in display order. The concrete models double as
/// the fixed comparison fan-out set, in table order.
pub const LLM_OPTIONS: &[ModelOption] = &[
    ModelOption {
        id: "gpt-4.1-mini",
        name: "GPT-4.1 Mini",
        icon: "🤖",
        color: Color::Blue,
        backend_id: "azure/gpt-4.1-mini",
        description: "Azure OpenAI GPT-4.1 Mini",
        mode: DispatchMode::Single,
    },
    ModelOption {
        id: "gpt-4o-mini",
        name: "GPT-4o Mini",
        icon: "🦾",
        color: Color::Cyan,
        backend_id: "azure/gpt-4o-mini",
        description: "Azure OpenAI GPT-4o Mini",
        mode: DispatchMode::Single,
    },
    ModelOption {
        id: "gpt-4.1-nano",
        name: "GPT-4.1 Nano",
        icon: "⚡",
        color: Color::BrightBlue,
        backend_id: "azure/gpt-4.1-nano",
        description: "Azure OpenAI GPT-4.1 Nano",
        mode: DispatchMode::Single,
    },
    ModelOption {
        id: "comparison",
        name: "Comparison",
        icon: "⚖️",
        color: Color::White,
        backend_id: "",
        description: "Compare all models",
        mode: DispatchMode::Comparison,
    },
    ModelOption {
        id: "comparison-version",
        name: "Comparison Version",
        icon: "📊",
        color: Color::Magenta,
        backend_id: "azure/gpt-4.1-mini",
        description: "Compare versions of the same product",
        mode: DispatchMode::ComparisonVersion,
    },
];

/// The default selection (first table entry)
pub fn default_option() -> &'static ModelOption {
    &LLM_OPTIONS[0]
}

/// Look up an option by its stable identifier
pub fn by_id(id: &str) -> Option<&'static ModelOption> {
    LLM_OPTIONS.iter().find(|opt| opt.id == id)
}

/// Look up an option by display name (case-insensitive)
pub fn by_name(name: &str) -> Option<&'static ModelOption> {
    LLM_OPTIONS
        .iter()
        .find(|opt| opt.name.eq_ignore_ascii_case(name))
}

/// The concrete models queried by Comparison mode, in fixed fan-out order
pub fn comparison_set() -> impl Iterator<Item = &'static ModelOption> {
    LLM_OPTIONS
        .iter()
        .filter(|opt| opt.mode == DispatchMode::Single)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id_and_name() {
        assert_eq!(by_id("gpt-4o-mini").unwrap().name, "GPT-4o Mini");
        assert_eq!(by_name("comparison").unwrap().id, "comparison");
        assert!(by_id("gpt-5").is_none());
    }

    #[test]
    fn test_default_is_first_concrete_model() {
        let opt = default_option();
        assert_eq!(opt.id, "gpt-4.1-mini");
        assert_eq!(opt.mode, DispatchMode::Single);
    }

    #[test]
    fn test_comparison_set_order() {
        let names: Vec<_> = comparison_set().map(|o| o.name).collect();
        assert_eq!(names, vec!["GPT-4.1 Mini", "GPT-4o Mini", "GPT-4.1 Nano"]);
    }

    #[test]
    fn test_virtual_options_resolve_modes() {
        assert_eq!(by_id("comparison").unwrap().mode, DispatchMode::Comparison);
        assert_eq!(
            by_id("comparison-version").unwrap().mode,
            DispatchMode::ComparisonVersion
        );
        // The pure fan-out option has no backend model of its own.
        assert!(by_id("comparison").unwrap().backend_id.is_empty());
        assert_eq!(
            by_id("comparison-version").unwrap().backend_id,
            "azure/gpt-4.1-mini"
        );
    }
}
