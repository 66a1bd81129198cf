//! Canned remedy lists for the handful of symptoms the assistant recognizes.

use serde::Serialize;
use std::collections::BTreeMap;

/// Remedy category, ordered as it is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemedyCategory {
    HomeRemedies,
    Ayurvedic,
    Allopathic,
    Homeopathic,
}

impl RemedyCategory {
    pub const ALL: [Self; 4] = [
        Self::HomeRemedies,
        Self::Ayurvedic,
        Self::Allopathic,
        Self::Homeopathic,
    ];

    /// Stable key used in serialized bundles
    pub fn key(&self) -> &'static str {
        match self {
            Self::HomeRemedies => "home_remedies",
            Self::Ayurvedic => "ayurvedic",
            Self::Allopathic => "allopathic",
            Self::Homeopathic => "homeopathic",
        }
    }

    /// Section heading for terminal output
    pub fn heading(&self) -> &'static str {
        match self {
            Self::HomeRemedies => "Home Remedies",
            Self::Ayurvedic => "Ayurvedic Medicines",
            Self::Allopathic => "Allopathic Medicines",
            Self::Homeopathic => "Homeopathic Medicines",
        }
    }
}

/// Symptom with a canned remedy bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownSymptom {
    Cough,
    Fever,
    BodyPain,
}

impl KnownSymptom {
    /// Lookup order; the first symptom found in the query wins
    pub const PRIORITY: [Self; 3] = [Self::Cough, Self::Fever, Self::BodyPain];

    /// Phrase searched for in the query
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Cough => "cough",
            Self::Fever => "fever",
            Self::BodyPain => "body pain",
        }
    }

    /// Remedies for one category, in display order
    pub fn remedies(&self, category: RemedyCategory) -> &'static [&'static str] {
        use RemedyCategory::*;

        match (self, category) {
            (Self::Cough, HomeRemedies) => &["Turmeric milk", "Ginger honey tea", "Steam inhalation"],
            (Self::Cough, Ayurvedic) => &["Sitopaladi Churna", "Tulsi syrup"],
            (Self::Cough, Allopathic) => &["Dextromethorphan", "Paracetamol"],
            (Self::Cough, Homeopathic) => &["Drosera", "Bryonia"],

            (Self::Fever, HomeRemedies) => &["Wet cloth on forehead", "Tulsi ginger tea", "Rest and fluids"],
            (Self::Fever, Ayurvedic) => &["Giloy juice", "Sudarshan Vati"],
            (Self::Fever, Allopathic) => &["Paracetamol", "Ibuprofen"],
            (Self::Fever, Homeopathic) => &["Aconite", "Ferrum Phos"],

            (Self::BodyPain, HomeRemedies) => &["Warm bath", "Turmeric milk", "Stretching and rest"],
            (Self::BodyPain, Ayurvedic) => &["Ashwagandha", "Bala oil massage"],
            (Self::BodyPain, Allopathic) => &["Paracetamol", "Ibuprofen"],
            (Self::BodyPain, Homeopathic) => &["Rhus tox", "Arnica"],
        }
    }

    /// Full four-category bundle for this symptom
    pub fn bundle(&self) -> RemedyBundle {
        let categories = RemedyCategory::ALL
            .into_iter()
            .map(|category| {
                let names = self
                    .remedies(category)
                    .iter()
                    .map(|name| name.to_string())
                    .collect();
                (category, names)
            })
            .collect();
        RemedyBundle { categories }
    }
}

/// Category to remedy-name mapping for one query.
///
/// An empty bundle means no known symptom matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemedyBundle {
    categories: BTreeMap<RemedyCategory, Vec<String>>,
}

impl RemedyBundle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Number of categories present
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn get(&self, category: RemedyCategory) -> Option<&[String]> {
        self.categories.get(&category).map(Vec::as_slice)
    }

    /// Categories with their remedies, in display order
    pub fn iter(&self) -> impl Iterator<Item = (RemedyCategory, &[String])> {
        self.categories
            .iter()
            .map(|(category, names)| (*category, names.as_slice()))
    }
}

/// First known symptom present in the query, honouring [`KnownSymptom::PRIORITY`]
pub fn matched_symptom(query: &str) -> Option<KnownSymptom> {
    let lower = query.to_lowercase();
    KnownSymptom::PRIORITY
        .into_iter()
        .find(|symptom| lower.contains(symptom.phrase()))
}

/// Remedy bundle for a query; empty when no known symptom matches
pub fn remedies_for(query: &str) -> RemedyBundle {
    matched_symptom(query)
        .map(|symptom| symptom.bundle())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(bundle: &RemedyBundle, category: RemedyCategory) -> Vec<&str> {
        bundle
            .get(category)
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_cough_wins_over_fever() {
        let bundle = remedies_for("I have a cough and fever");
        assert_eq!(bundle.len(), 4);
        assert_eq!(
            names(&bundle, RemedyCategory::HomeRemedies),
            ["Turmeric milk", "Ginger honey tea", "Steam inhalation"]
        );
        assert_eq!(
            names(&bundle, RemedyCategory::Ayurvedic),
            ["Sitopaladi Churna", "Tulsi syrup"]
        );
        assert_eq!(
            names(&bundle, RemedyCategory::Allopathic),
            ["Dextromethorphan", "Paracetamol"]
        );
        assert_eq!(
            names(&bundle, RemedyCategory::Homeopathic),
            ["Drosera", "Bryonia"]
        );
    }

    #[test]
    fn test_fever_bundle() {
        let bundle = remedies_for("high fever and body pain");
        assert_eq!(matched_symptom("high fever and body pain"), Some(KnownSymptom::Fever));
        assert_eq!(
            names(&bundle, RemedyCategory::HomeRemedies),
            ["Wet cloth on forehead", "Tulsi ginger tea", "Rest and fluids"]
        );
        assert_eq!(names(&bundle, RemedyCategory::Homeopathic), ["Aconite", "Ferrum Phos"]);
    }

    #[test]
    fn test_body_pain_bundle() {
        let bundle = remedies_for("body pain after running");
        assert_eq!(bundle.len(), 4);
        assert_eq!(
            names(&bundle, RemedyCategory::Ayurvedic),
            ["Ashwagandha", "Bala oil massage"]
        );
        assert_eq!(names(&bundle, RemedyCategory::Homeopathic), ["Rhus tox", "Arnica"]);
    }

    #[test]
    fn test_unknown_symptom_yields_empty_bundle() {
        let bundle = remedies_for("sore throat");
        assert!(bundle.is_empty());
        assert_eq!(bundle.len(), 0);
        assert!(bundle.get(RemedyCategory::HomeRemedies).is_none());
        // unsplit concatenation is not "body pain"
        assert!(remedies_for("bodypain").is_empty());
    }

    #[test]
    fn test_lookup_is_idempotent() {
        assert_eq!(remedies_for("cough"), remedies_for("cough"));
        assert_eq!(remedies_for("nothing"), remedies_for("nothing"));
    }

    #[test]
    fn test_iter_follows_display_order() {
        let bundle = KnownSymptom::Fever.bundle();
        let order: Vec<RemedyCategory> = bundle.iter().map(|(c, _)| c).collect();
        assert_eq!(order, RemedyCategory::ALL);
    }

    #[test]
    fn test_bundle_serializes_with_category_keys() {
        let json = serde_json::to_value(KnownSymptom::Cough.bundle()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        for category in RemedyCategory::ALL {
            assert!(json.get(category.key()).is_some(), "missing {}", category.key());
        }
        assert_eq!(json["ayurvedic"][1], "Tulsi syrup");

        let empty = serde_json::to_string(&RemedyBundle::empty()).unwrap();
        assert_eq!(empty, "{}");
    }
}
