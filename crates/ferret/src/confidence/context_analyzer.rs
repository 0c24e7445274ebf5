//! Domain and document-type inference from body text.

use crate::types::{ContextInsights, Domain};

/// Keyword vocabulary per domain. Counts are compared across domains; the
/// winner must clear a small floor to displace the default.
const VOCABULARIES: &[(Domain, &[&str])] = &[
    (
        Domain::Healthcare,
        &[
            "patient", "diagnosis", "medical", "hospital", "prescription", "hipaa", "clinic", "treatment",
            "physician", "insurance claim",
        ],
    ),
    (
        Domain::Financial,
        &[
            "invoice", "payment", "account", "bank", "credit", "transaction", "loan", "statement", "routing",
            "balance",
        ],
    ),
    (
        Domain::HrPayroll,
        &[
            "employee", "payroll", "salary", "benefits", "w-2", "onboarding", "personnel", "timesheet",
            "compensation", "termination",
        ],
    ),
    (
        Domain::Legal,
        &["contract", "agreement", "plaintiff", "attorney", "court", "clause", "jurisdiction", "liability"],
    ),
    (
        Domain::Technology,
        &["server", "api", "deploy", "config", "database", "endpoint", "kubernetes", "repository"],
    ),
];

/// Document-type hints checked in order; first hit wins.
const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("invoice", "invoice"),
    ("pay stub", "pay_stub"),
    ("paystub", "pay_stub"),
    ("medical record", "medical_record"),
    ("resume", "resume"),
    ("curriculum vitae", "resume"),
    ("contract", "contract"),
    ("agreement", "contract"),
    ("statement", "statement"),
    ("report", "report"),
];

/// Infer the domain and document type of a file from its body text.
pub fn analyze(text: &str) -> ContextInsights {
    let lower = text.to_lowercase();

    let mut best = (Domain::General, 0usize, 0usize);
    let mut tags = Vec::new();
    for (domain, vocabulary) in VOCABULARIES {
        let hits = vocabulary.iter().filter(|k| lower.contains(*k)).count();
        if hits > 0 {
            tags.push(format!("{:?}", domain).to_lowercase());
        }
        if hits > best.1 {
            best = (*domain, hits, vocabulary.len());
        }
    }

    // A single stray keyword is not enough evidence to leave the default.
    let (domain, domain_confidence) = if best.1 >= 2 {
        (best.0, (best.1 as f64 / best.2 as f64).min(1.0))
    } else {
        (Domain::General, 0.0)
    };

    let document_type = DOCUMENT_TYPES
        .iter()
        .find(|(hint, _)| lower.contains(hint))
        .map(|(_, ty)| ty.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    ContextInsights {
        domain,
        document_type,
        domain_confidence,
        semantic_tags: tags,
        signal_hints: Vec::new(),
    }
}
