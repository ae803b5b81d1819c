//! Card holder name handling and e-mail guessing.

/// Full-name collisions that map to a shorter local part.
pub const BUILTIN_OVERRIDES: &[(&str, &str)] = &[
    ("jaakko.santeri.raisanen", "santeri.raisanen"),
    ("rolando.ojeda.montiel", "rolando.ojeda"),
];

/// Organisation domain used when none is configured.
pub const DEFAULT_EMAIL_DOMAIN: &str = "solinor.com";

/// Drop a `<cost-center>/` prefix from a card holder field.
pub fn strip_cost_center(raw: &str) -> &str {
    match raw.split_once('/') {
        Some((_, name)) => name.trim(),
        None => raw.trim(),
    }
}

/// Derives an organisation e-mail address from a card holder name.
///
/// The result is a guess; nothing checks it against a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailGuesser {
    domain: String,
    overrides: Vec<(String, String)>,
}

impl EmailGuesser {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            overrides: BUILTIN_OVERRIDES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    /// Append name overrides after the built-in ones.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = (String, String)>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn guess(&self, card_holder: &str) -> String {
        let mut local = card_holder
            .trim()
            .to_lowercase()
            .replace('ä', "a")
            .replace('ö', "o")
            .replace(' ', ".");

        // Overrides apply to the folded local part
        for (from, to) in &self.overrides {
            local = local.replace(from.as_str(), to);
        }

        format!("{}@{}", local, self.domain)
    }
}

impl Default for EmailGuesser {
    fn default() -> Self {
        Self::new(DEFAULT_EMAIL_DOMAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_cost_center() {
        assert_eq!(strip_cost_center("1234/MATTI MEIKÄLÄINEN"), "MATTI MEIKÄLÄINEN");
        assert_eq!(strip_cost_center(" MATTI MEIKÄLÄINEN "), "MATTI MEIKÄLÄINEN");
    }

    #[test]
    fn test_guess_folds_accents() {
        let guesser = EmailGuesser::default();
        assert_eq!(guesser.guess("MATTI MEIKÄLÄINEN"), "matti.meikalainen@solinor.com");
        assert_eq!(guesser.guess("Örjan Söderström"), "orjan.soderstrom@solinor.com");
    }

    #[test]
    fn test_guess_applies_collision_overrides() {
        let guesser = EmailGuesser::default();
        assert_eq!(
            guesser.guess("JAAKKO SANTERI RÄISÄNEN"),
            "santeri.raisanen@solinor.com"
        );
        assert_eq!(
            guesser.guess("Rolando Ojeda Montiel"),
            "rolando.ojeda@solinor.com"
        );
    }

    #[test]
    fn test_configured_overrides_and_domain() {
        let guesser = EmailGuesser::new("example.com")
            .with_overrides([("anna.maria.virtanen".to_string(), "anna.virtanen".to_string())]);

        assert_eq!(guesser.domain(), "example.com");
        assert_eq!(guesser.guess("Anna Maria Virtanen"), "anna.virtanen@example.com");
    }
}
