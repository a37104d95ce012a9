//! Prompt definitions compiled into the binary.

/// `(id, yaml)` pairs for every built-in prompt.
pub const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    ("advisor.intake", include_str!("../prompts/advisor.intake.yml")),
    ("advisor.refine", include_str!("../prompts/advisor.refine.yml")),
    ("advisor.resume", include_str!("../prompts/advisor.resume.yml")),
    ("retrieval.weights", include_str!("../prompts/retrieval.weights.yml")),
    ("recommend.json", include_str!("../prompts/recommend.json.yml")),
    ("recommend.text", include_str!("../prompts/recommend.text.yml")),
    ("recommend.narrative", include_str!("../prompts/recommend.narrative.yml")),
];

/// Look up the YAML source of a built-in prompt.
pub fn builtin_source(id: &str) -> Option<&'static str> {
    BUILTIN_PROMPTS
        .iter()
        .find(|(builtin_id, _)| *builtin_id == id)
        .map(|(_, source)| *source)
}

pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTIN_PROMPTS.iter().map(|(id, _)| *id)
}
