use super::Config;

/// Locales with translation files under `locales/`.
pub const SUPPORTED_LOCALES: &[&str] = &["en", "ru"];

/// Normalise `"ru_RU.UTF-8"` -> `"ru"`, `"en-US"` -> `"en"`, passthrough `"ru"`.
pub fn normalise_locale(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    let base = trimmed.split('.').next().unwrap_or(&trimmed);
    base.split(['_', '-']).next().unwrap_or(base).to_string()
}

/// Pick the first supported locale among `preferred` and `fallback`, else `"en"`.
pub fn resolve_locale(preferred: Option<&str>, fallback: &str) -> &'static str {
    [preferred, Some(fallback)]
        .into_iter()
        .flatten()
        .map(normalise_locale)
        .find_map(|candidate| {
            SUPPORTED_LOCALES
                .iter()
                .copied()
                .find(|supported| *supported == candidate)
        })
        .unwrap_or("en")
}

impl Config {
    /// Set the process-wide default locale used by `t!` without an explicit locale.
    pub fn apply_locale(&self) {
        rust_i18n::set_locale(resolve_locale(None, &self.locale));
    }
}
