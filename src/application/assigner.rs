//! # Fair Assigner
//!
//! Routes each tracked-account post to the manager with the fewest prior
//! assignments. Ties go to the earliest manager in configured order.

use crate::application::state::StateStore;
use crate::domain::config::Recipient;

pub struct FairAssigner {
    pool: Vec<Recipient>,
    state: StateStore,
}

impl FairAssigner {
    pub fn new(pool: Vec<Recipient>, state: StateStore) -> Self {
        Self { pool, state }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.pool
    }

    /// Picks the least-loaded recipient, records the assignment and persists it.
    pub async fn assign(&self) -> Option<Recipient> {
        if self.pool.is_empty() {
            return None;
        }

        self.state
            .update(|s| {
                let mut selected = &self.pool[0];
                let mut lowest = u64::MAX;
                for recipient in &self.pool {
                    let count = s.assignment_counts.get(&recipient.name).copied().unwrap_or(0);
                    if count < lowest {
                        lowest = count;
                        selected = recipient;
                    }
                }
                *s.assignment_counts.entry(selected.name.clone()).or_insert(0) += 1;
                Some(selected.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn managers(names: &[&str]) -> Vec<Recipient> {
        names
            .iter()
            .map(|n| Recipient {
                name: n.to_string(),
                room: format!("!{}:example.org", n.to_lowercase()),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_nine_assignments_over_three() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        let assigner = FairAssigner::new(managers(&["Igor", "Roman", "Dyma"]), store.clone());

        let mut picks = Vec::new();
        for _ in 0..9 {
            picks.push(assigner.assign().await.unwrap().name);
        }

        assert_eq!(picks[0], "Igor");
        let mut tally: HashMap<String, usize> = HashMap::new();
        for name in &picks {
            *tally.entry(name.clone()).or_default() += 1;
        }
        assert!(tally.values().all(|&count| count == 3), "{:?}", tally);
        assert_eq!(store.snapshot().await.assignment_counts.get("Dyma"), Some(&3));
    }

    #[tokio::test]
    async fn test_prefers_least_loaded() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        store
            .update(|s| {
                s.assignment_counts.insert("Igor".to_string(), 4);
                s.assignment_counts.insert("Roman".to_string(), 2);
                s.assignment_counts.insert("Dyma".to_string(), 2);
            })
            .await;
        let assigner = FairAssigner::new(managers(&["Igor", "Roman", "Dyma"]), store);

        assert_eq!(assigner.assign().await.unwrap().name, "Roman");
        assert_eq!(assigner.assign().await.unwrap().name, "Dyma");
        assert_eq!(assigner.assign().await.unwrap().name, "Roman");
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        assert_eq!(FairAssigner::new(Vec::new(), store).assign().await, None);
    }
}
