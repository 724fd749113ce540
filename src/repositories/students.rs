use crate::db::{CollectionPath, DocPath, Document, DocumentStore, StoreError};

fn profile(student_code: &str) -> DocPath {
    CollectionPath::root("students").doc(student_code.trim())
}

/// Roster entry for a student; amounts are stored as numbers or text such as
/// `"GHS 1,200"`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StudentProfile {
    pub(crate) student_code: String,
    pub(crate) name: String,
    pub(crate) level: String,
    pub(crate) contract_start: Option<String>,
    pub(crate) paid: f64,
    pub(crate) balance: f64,
}

fn amount(doc: &Document, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|key| {
            doc.f64_field(key).or_else(|| {
                doc.text_field(key)
                    .map(|text| text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect::<String>())
                    .and_then(|digits| digits.parse().ok())
            })
        })
        .unwrap_or(0.0)
}

impl StudentProfile {
    fn from_document(doc: &Document) -> Self {
        Self {
            student_code: doc.id.clone(),
            name: doc.text_field("name").unwrap_or_default(),
            level: doc.text_field("level").unwrap_or_default().to_uppercase(),
            contract_start: doc.text_field("contract_start"),
            paid: amount(doc, &["paid", "amount_paid"]),
            balance: amount(doc, &["balance"]),
        }
    }
}

pub(crate) async fn fetch_profile(
    store: &dyn DocumentStore,
    student_code: &str,
) -> Result<Option<StudentProfile>, StoreError> {
    Ok(store.get(&profile(student_code)).await?.map(|doc| StudentProfile::from_document(&doc)))
}
