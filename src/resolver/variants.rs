// file: src/resolver/variants.rs
// description: known header spellings for each semantic column role
// reference: headers observed across independently authored test sheets

use crate::config::ColumnsConfig;
use crate::models::Role;
use lazy_static::lazy_static;

lazy_static! {
    pub static ref NAME_VARIANTS: Vec<&'static str> = vec![
        "Full Name",
        "Full Names",
        "Name",
        "Names",
        "Participant",
        "Participant Name",
        "Student Name",
        "Student",
        "Candidate Name",
        "Candidate",
        "Learner",
        "Trainee",
        "First and Last Name",
    ];

    pub static ref EMAIL_VARIANTS: Vec<&'static str> = vec![
        "Email",
        "E-mail",
        "Email Address",
        "E-mail Address",
        "Emails",
        "Mail",
        "Participant Email",
        "Student Email",
    ];

    // Order matters only for documentation; every variant is scored.
    pub static ref SCORE_VARIANTS: Vec<&'static str> = vec![
        "Score",
        "% Score",
        "Score (%)",
        "Scores",
        "Result",
        "Results",
        "Percentage",
        "Percent",
        "Marks",
        "Mark",
        "Grade",
        "Total Score",
        "Final Score",
        "Points",
        "%",
    ];
}

/// Variant lists per role, built-ins first then configured extras.
#[derive(Debug, Clone)]
pub struct RoleVariants {
    pub name: Vec<String>,
    pub email: Vec<String>,
    pub score: Vec<String>,
}

impl RoleVariants {
    pub fn with_extras(columns: &ColumnsConfig) -> Self {
        let mut variants = Self::default();
        variants.name.extend(columns.extra_name_variants.iter().cloned());
        variants.email.extend(columns.extra_email_variants.iter().cloned());
        variants.score.extend(columns.extra_score_variants.iter().cloned());
        variants
    }

    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::Name => &self.name,
            Role::Email => &self.email,
            Role::Score => &self.score,
        }
    }
}

impl Default for RoleVariants {
    fn default() -> Self {
        Self {
            name: owned(&NAME_VARIANTS),
            email: owned(&EMAIL_VARIANTS),
            score: owned(&SCORE_VARIANTS),
        }
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
