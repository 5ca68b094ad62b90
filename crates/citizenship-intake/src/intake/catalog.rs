use std::collections::HashSet;

use serde::Serialize;

/// A single checklist requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub required: bool,
}

/// Display group of checklist requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCategory {
    pub name: &'static str,
    pub documents: Vec<DocumentDefinition>,
}

/// Catalog entry resolved together with the category that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry<'a> {
    pub category: &'a str,
    pub definition: &'a DocumentDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must define at least one document")]
    Empty,
    #[error("category '{0}' has no documents")]
    EmptyCategory(String),
    #[error("document id '{0}' appears more than once")]
    DuplicateId(String),
}

/// Read-only checklist configuration. Category order and in-category order are
/// preserved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistCatalog {
    categories: Vec<DocumentCategory>,
}

impl ChecklistCatalog {
    pub fn new(categories: Vec<DocumentCategory>) -> Result<Self, CatalogError> {
        if categories.iter().all(|category| category.documents.is_empty()) {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for category in &categories {
            if category.documents.is_empty() {
                return Err(CatalogError::EmptyCategory(category.name.to_string()));
            }
            for document in &category.documents {
                if !seen.insert(document.id) {
                    return Err(CatalogError::DuplicateId(document.id.to_string()));
                }
            }
        }

        Ok(Self { categories })
    }

    /// The intake checklist used for every new application.
    pub fn standard() -> Self {
        Self {
            categories: standard_categories(),
        }
    }

    pub fn categories(&self) -> &[DocumentCategory] {
        &self.categories
    }

    pub fn documents(&self) -> impl Iterator<Item = CatalogEntry<'_>> + '_ {
        self.categories.iter().flat_map(|category| {
            category.documents.iter().map(move |definition| CatalogEntry {
                category: category.name,
                definition,
            })
        })
    }

    pub fn total_documents(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.documents.len())
            .sum()
    }

    pub fn lookup(&self, id: &str) -> Option<CatalogEntry<'_>> {
        self.documents().find(|entry| entry.definition.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.documents().map(|entry| entry.definition.id)
    }

    pub fn required_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.documents()
            .filter(|entry| entry.definition.required)
            .map(|entry| entry.definition.id)
    }
}

impl Default for ChecklistCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

const fn doc(id: &'static str, label: &'static str, required: bool) -> DocumentDefinition {
    DocumentDefinition {
        id,
        label,
        required,
    }
}

fn standard_categories() -> Vec<DocumentCategory> {
    vec![
        DocumentCategory {
            name: "إثبات الهوية",
            documents: vec![
                doc(
                    "passport_bio",
                    "صفحة المعلومات البيومترية من جواز السفر الحالي (نسخة ملونة معتمدة)",
                    true,
                ),
                doc(
                    "travel_doc",
                    "صفحة المعلومات البيومترية من وثيقة السفر الحالية (نسخة ملونة معتمدة)",
                    true,
                ),
                doc("affidavit", "تصريح موثق (إذا لم يكن لديك جواز سفر)", false),
                doc(
                    "passport_cert_form",
                    "نموذج اعتماد جواز السفر (موقع من محام)",
                    true,
                ),
                doc("birth_cert", "شهادة الميلاد الأصلية (نسخة ملونة معتمدة)", true),
                doc("birth_cert_trans", "شهادة الميلاد المترجمة (نسخة ملونة)", false),
                doc("marriage_cert", "شهادة الزواج (نسخة ملونة معتمدة)", false),
                doc(
                    "marriage_cert_trans",
                    "شهادة الزواج المترجمة (نسخة ملونة)",
                    false,
                ),
                doc(
                    "irp_card",
                    "بطاقة الإقامة الأيرلندية - الأمام والخلف (معتمدة)",
                    true,
                ),
                doc(
                    "pps_card",
                    "بطاقة الخدمات العامة - الأمام والخلف (معتمدة)",
                    true,
                ),
                doc(
                    "driving_license",
                    "رخصة القيادة الأيرلندية - الأمام والخلف (معتمدة)",
                    true,
                ),
                doc("refugee_letter", "خطاب حالة اللاجئ (معتمد)", false),
            ],
        },
        DocumentCategory {
            name: "إثبات الإقامة",
            documents: vec![
                doc("employment_summary", "ملخص تفاصيل التوظيف (لكل سنة)", true),
                doc("bank_statement", "كشف الحساب البنكي (لكل سنة)", true),
                doc(
                    "social_contribution",
                    "بيان المساهمة في الحماية الاجتماعية (لكل سنة)",
                    true,
                ),
                doc(
                    "social_payment",
                    "بيان دفع الحماية الاجتماعية (لكل سنة)",
                    true,
                ),
                doc("rent_agreement", "عقد الإيجار", false),
                doc(
                    "landlord_ref",
                    "خطاب مرجعي من المالك أو شركة العقارات",
                    false,
                ),
                doc("ipas_letter", "خطاب إثبات العنوان من IPAS", false),
                doc(
                    "utility_bills",
                    "فواتير المرافق (الكهرباء والغاز والإنترنت)",
                    false,
                ),
            ],
        },
        DocumentCategory {
            name: "المعلومات الشخصية",
            documents: vec![
                doc("asylum_date", "تاريخ طلب الحماية", true),
                doc("refugee_date", "تاريخ الحصول على حالة اللاجئ", true),
                doc("references", "3 مراجع أيرلندية مع أرقام الهاتف", true),
            ],
        },
    ]
}
