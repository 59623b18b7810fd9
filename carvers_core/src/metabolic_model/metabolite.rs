//! This module provides the metabolite struct representing a metabolite
use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(setter(into))]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique)
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(default = "None")]
    pub notes: Option<String>,
}

impl Metabolite {
    /// Create a metabolite from its id alone
    ///
    /// Universe ids end with a compartment suffix (`glc__D_e`, `pyr_c`), which is used as the
    /// compartment when present.
    ///
    /// # Examples
    /// ```rust
    /// use carvers_core::metabolic_model::metabolite::Metabolite;
    /// let glucose = Metabolite::new("M_glc__D_e");
    /// assert_eq!(glucose.compartment.as_deref(), Some("e"));
    /// assert_eq!(Metabolite::new("atp").compartment, None);
    /// ```
    pub fn new(id: &str) -> Metabolite {
        let compartment = id
            .rsplit_once('_')
            .map(|(_, suffix)| suffix)
            .filter(|suffix| !suffix.is_empty() && suffix.len() <= 2)
            .filter(|suffix| {
                suffix
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            })
            .map(str::to_string);
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment,
            formula: None,
            notes: None,
        }
    }

    /// Compound part of the id, without compartment suffix
    ///
    /// This is the form media list their compounds in.
    pub fn compound(&self) -> &str {
        match &self.compartment {
            Some(c) => self
                .id
                .strip_suffix(c.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
                .unwrap_or(&self.id),
            None => &self.id,
        }
    }
}
