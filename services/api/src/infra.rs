use admissions_readiness::scoring::{
    PublishError, RepositoryError, ScoreChangeNotice, ScoreChangePublisher, ScoreTarget,
    Scorebook, ScorebookRepository, StudentId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScorebookRepository {
    books: Arc<Mutex<HashMap<StudentId, Scorebook>>>,
}

impl ScorebookRepository for InMemoryScorebookRepository {
    fn insert(&self, scorebook: Scorebook) -> Result<Scorebook, RepositoryError> {
        let mut guard = self.books.lock().expect("repository mutex poisoned");
        if guard.contains_key(scorebook.student_id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(scorebook.student_id().clone(), scorebook.clone());
        Ok(scorebook)
    }

    fn update(&self, scorebook: Scorebook) -> Result<(), RepositoryError> {
        let mut guard = self.books.lock().expect("repository mutex poisoned");
        if guard.contains_key(scorebook.student_id()) {
            guard.insert(scorebook.student_id().clone(), scorebook);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, student_id: &StudentId) -> Result<Option<Scorebook>, RepositoryError> {
        let guard = self.books.lock().expect("repository mutex poisoned");
        Ok(guard.get(student_id).cloned())
    }

    fn students(&self) -> Result<Vec<StudentId>, RepositoryError> {
        let guard = self.books.lock().expect("repository mutex poisoned");
        let mut students: Vec<StudentId> = guard.keys().cloned().collect();
        students.sort();
        Ok(students)
    }
}

/// Records every notice and mirrors it to the log; stands in for the notification layer.
#[derive(Default, Clone)]
pub(crate) struct LoggingChangePublisher {
    notices: Arc<Mutex<Vec<ScoreChangeNotice>>>,
}

impl ScoreChangePublisher for LoggingChangePublisher {
    fn publish(&self, notice: ScoreChangeNotice) -> Result<(), PublishError> {
        for change in &notice.changes {
            let score_target = match change.target {
                ScoreTarget::Category(category) => category.key(),
                ScoreTarget::Overall => "overall",
            };
            info!(
                student_id = %notice.student_id,
                version = notice.version,
                score_target,
                before = ?change.before,
                after = ?change.after,
                "readiness score changed"
            );
        }
        let mut guard = self.notices.lock().expect("notice mutex poisoned");
        guard.push(notice);
        Ok(())
    }
}

impl LoggingChangePublisher {
    pub(crate) fn notices(&self) -> Vec<ScoreChangeNotice> {
        self.notices.lock().expect("notice mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admissions_readiness::scoring::ReadinessBlueprint;

    #[test]
    fn update_requires_an_existing_scorebook() {
        let repository = InMemoryScorebookRepository::default();
        let book = Scorebook::new(StudentId::from("stu-1"), ReadinessBlueprint::standard());

        assert!(matches!(
            repository.update(book.clone()),
            Err(RepositoryError::NotFound)
        ));
        repository.insert(book.clone()).expect("insert succeeds");
        assert!(matches!(
            repository.insert(book.clone()),
            Err(RepositoryError::Conflict)
        ));
        repository.update(book).expect("update succeeds");
        assert_eq!(
            repository.students().expect("students listed"),
            vec![StudentId::from("stu-1")]
        );
    }
}
