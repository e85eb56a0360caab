// file: src/resolver/mod.rs
// description: maps a table's raw headers onto the name, email and score roles
// reference: deterministic max-score selection with left-to-right tie-break

pub mod matcher;
pub mod variants;

pub use matcher::{best_score, match_score};
pub use variants::RoleVariants;

use crate::config::ColumnsConfig;
use crate::error::{CompileError, Result};
use crate::models::{ColumnRoles, ResolvedColumn, Role};
use std::path::Path;
use tracing::{debug, warn};

const DIAGNOSTIC_HEADER_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct ColumnResolver {
    variants: RoleVariants,
    threshold: f64,
}

impl ColumnResolver {
    pub fn new(variants: RoleVariants, threshold: f64) -> Self {
        Self {
            variants,
            threshold,
        }
    }

    pub fn from_config(columns: &ColumnsConfig) -> Self {
        Self::new(RoleVariants::with_extras(columns), columns.match_threshold)
    }

    /// Highest-scoring header for `role`, or `None` when nothing clears the threshold.
    /// Ties keep the leftmost header.
    pub fn best_header(&self, headers: &[String], role: Role) -> Option<ResolvedColumn> {
        let variants = self.variants.for_role(role);
        let mut best: Option<ResolvedColumn> = None;

        for (index, header) in headers.iter().enumerate() {
            let score = best_score(header, variants);
            let better = match &best {
                Some(current) => score > current.confidence,
                None => true,
            };
            if better && score > 0.0 {
                best = Some(ResolvedColumn {
                    header: header.clone(),
                    index,
                    confidence: score,
                });
            }
        }

        best.filter(|column| column.confidence > self.threshold)
    }

    /// True when some header resolves for `role`.
    pub fn has_role(&self, headers: &[String], role: Role) -> bool {
        self.best_header(headers, role).is_some()
    }

    pub fn resolve(&self, file: &Path, headers: &[String]) -> Result<ColumnRoles> {
        let name = self.best_header(headers, Role::Name);
        let email = self.best_header(headers, Role::Email);
        let score = self.best_header(headers, Role::Score);

        let unresolved: Vec<String> = [(Role::Name, &name), (Role::Email, &email), (Role::Score, &score)]
            .iter()
            .filter(|(_, column)| column.is_none())
            .map(|(role, _)| role.to_string())
            .collect();

        let (Some(name), Some(email), Some(score)) = (name, email, score) else {
            return Err(self.detection_error(file, headers, unresolved));
        };

        let roles = ColumnRoles { name, email, score };
        self.ensure_distinct(file, headers, &roles)?;

        debug!(
            "Resolved columns for {}: name='{}' ({:.2}), email='{}' ({:.2}), score='{}' ({:.2})",
            file.display(),
            roles.name.header,
            roles.name.confidence,
            roles.email.header,
            roles.email.confidence,
            roles.score.header,
            roles.score.confidence
        );

        if roles.score.confidence < matcher::SUBSTRING {
            warn!(
                "Score column '{}' in {} matched only weakly ({:.2}); check the sheet",
                roles.score.header,
                file.display(),
                roles.score.confidence
            );
        }

        Ok(roles)
    }

    fn ensure_distinct(&self, file: &Path, headers: &[String], roles: &ColumnRoles) -> Result<()> {
        let mut clashing = Vec::new();
        for (i, a) in Role::ALL.iter().enumerate() {
            for b in &Role::ALL[i + 1..] {
                if roles.get(*a).index == roles.get(*b).index {
                    clashing.push(format!("{}/{} share '{}'", a, b, roles.get(*a).header));
                }
            }
        }

        if clashing.is_empty() {
            Ok(())
        } else {
            Err(self.detection_error(file, headers, clashing))
        }
    }

    fn detection_error(&self, file: &Path, headers: &[String], unresolved: Vec<String>) -> CompileError {
        CompileError::ColumnDetection {
            file: file.to_path_buf(),
            unresolved,
            available: headers
                .iter()
                .take(DIAGNOSTIC_HEADER_LIMIT)
                .map(|h| format!("'{}'", h))
                .collect(),
        }
    }
}

impl Default for ColumnResolver {
    fn default() -> Self {
        Self::from_config(&ColumnsConfig::default())
    }
}
