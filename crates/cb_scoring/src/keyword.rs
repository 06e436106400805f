use cb_core::{Article, RelevanceAssessment};

/// Terms that almost always mark an article as directly useful to students.
const STRONG_SIGNALS: &[&str] = &[
    "student",
    "scholarship",
    "tuition",
    "university",
    "college",
    "internship",
    "financial aid",
    "student loan",
    "campus",
    "exam",
    "semester",
    "graduate",
    "apprenticeship",
];

/// Terms that correlate with student interest but need company.
const WEAK_SIGNALS: &[&str] = &[
    "education",
    "career",
    "job",
    "housing",
    "rent",
    "budget",
    "savings",
    "research",
    "technology",
    "health",
    "course",
    "degree",
    "part-time",
];

const PRIORITY_THRESHOLD: f64 = 7.0;

/// Deterministic keyword-match scoring, used when AI scoring is disabled
/// or fails. Each distinct strong signal counts 2, each weak signal 1,
/// capped at 10.
pub fn keyword_assessment(article: &Article) -> RelevanceAssessment {
    let haystack = format!(
        "{} {} {}",
        article.title,
        article.description,
        article.content.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    let matched_strong: Vec<&str> = STRONG_SIGNALS
        .iter()
        .copied()
        .filter(|term| haystack.contains(term))
        .collect();
    let weak_hits = WEAK_SIGNALS
        .iter()
        .filter(|term| haystack.contains(*term))
        .count();

    let raw = matched_strong.len() * 2 + weak_hits;
    let score = (raw as f64).min(10.0);

    RelevanceAssessment {
        score,
        student_priority: score >= PRIORITY_THRESHOLD,
        reasoning: format!(
            "Keyword fallback: {} strong and {} weak signals matched",
            matched_strong.len(),
            weak_hits
        ),
        categories: matched_strong.iter().map(|s| s.to_string()).collect(),
    }
}
