//! The running tracker: roster, ledger and the store they persist to.
//!
//! [`AttendanceSession`] is the single writer. Every mutation runs to
//! completion in memory first, then pushes the whole affected document back
//! to the store on a spawned task. The caller gets a [`SaveHandle`] for those
//! tasks and may await it or let it run. A failed save is reported but never
//! rolls back the in-memory change.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use attendance_core::ledger::LedgerSnapshot;
use attendance_core::models::{AttendanceStatus, Student};
use attendance_core::notifications::Notice;
use attendance_core::time_utils::{format_date_key, Clock};
use attendance_core::{AttendanceError, Ledger, Result, Roster};
use attendance_data::import::{import_students_from_path, ImportReport};

use crate::store::{CollectionKey, DocumentStore};

// ── SaveHandle ────────────────────────────────────────────────────────────────

/// Completion signal for the saves started by one mutation.
///
/// Dropping the handle detaches the saves; they still run to completion.
#[derive(Debug, Default)]
#[must_use = "await the handle or call `detach` to let the saves run unobserved"]
pub struct SaveHandle {
    tasks: Vec<(CollectionKey, JoinHandle<Result<()>>)>,
}

impl SaveHandle {
    /// Handle for a mutation that wrote nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Keys with a save in flight or finished.
    pub fn keys(&self) -> Vec<CollectionKey> {
        self.tasks.iter().map(|(key, _)| *key).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every save and collect the ones that failed.
    pub async fn failures(self) -> Vec<AttendanceError> {
        let mut errors = Vec::new();
        for (key, task) in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(join) => errors.push(AttendanceError::Persistence(format!(
                    "save of {key} did not complete: {join}"
                ))),
            }
        }
        errors
    }

    /// Wait for every save; the first failure, if any, is returned.
    pub async fn wait(self) -> Result<()> {
        match self.failures().await.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Let the saves finish in the background.
    pub fn detach(self) {
        tracing::debug!(saves = self.tasks.len(), "save handle detached");
    }
}

// ── AttendanceSession ─────────────────────────────────────────────────────────

/// Roster and ledger for one running tracker, backed by a [`DocumentStore`].
#[derive(Debug)]
pub struct AttendanceSession<S> {
    roster: Roster,
    ledger: Ledger,
    store: Arc<S>,
}

impl<S: DocumentStore + 'static> AttendanceSession<S> {
    /// Load both documents from `store`.
    ///
    /// A document that cannot be read leaves that side empty and adds a
    /// warning notice. With `seed_demo`, an empty roster is replaced by
    /// [`Roster::demo`] and written back before returning.
    pub async fn load(store: Arc<S>, seed_demo: bool) -> (Self, Vec<Notice>) {
        let mut notices = Vec::new();

        let ledger = match load_ledger(store.as_ref()).await {
            Ok(ledger) => ledger,
            Err(e) => {
                tracing::warn!(error = %e, "attendance could not be loaded");
                notices.push(Notice::from_error(&e));
                Ledger::new()
            }
        };

        let mut roster = match load_roster(store.as_ref()).await {
            Ok(roster) => roster,
            Err(e) => {
                tracing::warn!(error = %e, "students could not be loaded");
                notices.push(Notice::from_error(&e));
                Roster::new()
            }
        };

        if roster.is_empty() && seed_demo {
            roster = Roster::demo();
            tracing::info!(students = roster.len(), "seeding demo roster");
            let saved = match serde_json::to_value(&roster) {
                Ok(value) => store.save(CollectionKey::Students, value).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = saved {
                tracing::warn!(error = %e, "demo roster could not be saved");
                notices.push(Notice::from_error(&e));
            }
        }

        tracing::info!(
            students = roster.len(),
            dates = ledger.all_dates().len(),
            records = ledger.record_count(),
            "session loaded"
        );

        (
            Self {
                roster,
                ledger,
                store,
            },
            notices,
        )
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Record `status` for `name` on `date` (`YYYY-MM-DD`), replacing any
    /// earlier mark for that day.
    ///
    /// Only students on the roster can be marked.
    pub fn mark_status(
        &mut self,
        date: &str,
        name: &str,
        status: AttendanceStatus,
    ) -> Result<(Notice, SaveHandle)> {
        if !self.roster.contains(name) {
            return Err(AttendanceError::StudentNotFound(name.to_string()));
        }
        self.ledger.upsert(date, name, status)?;

        let notice = Notice::new(
            status.notice_level(),
            format!("{name} marked {}", status.as_str().to_lowercase()),
        );
        let handle = self.persist(&[CollectionKey::Attendance])?;
        Ok((notice, handle))
    }

    /// [`mark_status`](Self::mark_status) for today according to `clock`.
    pub fn mark_today(
        &mut self,
        clock: &impl Clock,
        name: &str,
        status: AttendanceStatus,
    ) -> Result<(Notice, SaveHandle)> {
        let today = format_date_key(clock.today());
        self.mark_status(&today, name, status)
    }

    /// Append a student to the roster.
    pub fn add_student(&mut self, student: Student) -> Result<(Notice, SaveHandle)> {
        self.roster.add(student)?;
        let handle = self.persist(&[CollectionKey::Students])?;
        Ok((Notice::success("Student added successfully"), handle))
    }

    /// Remove a student and every attendance record under their name.
    pub fn remove_student(&mut self, name: &str) -> Result<(Notice, SaveHandle)> {
        let student = self
            .roster
            .remove(name)
            .ok_or_else(|| AttendanceError::StudentNotFound(name.to_string()))?;
        let records = self.ledger.remove_student(&student.name);
        tracing::debug!(name = %student.name, records, "student removed with records");

        let handle = self.persist(&[CollectionKey::Students, CollectionKey::Attendance])?;
        Ok((
            Notice::success(format!("Student {} removed successfully", student.name)),
            handle,
        ))
    }

    /// Append the students of a parsed import.
    ///
    /// Nothing is written when the report adds no one.
    pub fn apply_import(&mut self, report: &ImportReport) -> Result<(Notice, SaveHandle)> {
        let mut added = 0usize;
        for student in &report.added {
            match self.roster.add(student.clone()) {
                Ok(()) => added += 1,
                Err(e) => tracing::warn!(name = %student.name, error = %e, "import row rejected"),
            }
        }

        let handle = if added > 0 {
            self.persist(&[CollectionKey::Students])?
        } else {
            SaveHandle::none()
        };
        Ok((report.notice(), handle))
    }

    /// Parse the CSV at `path` against the current roster and apply it.
    pub fn import_from_path(&mut self, path: &Path) -> Result<(Notice, SaveHandle)> {
        let report = import_students_from_path(path, &self.roster)?;
        self.apply_import(&report)
    }

    // ── Persistence ───────────────────────────────────────────────────────

    fn persist(&self, keys: &[CollectionKey]) -> Result<SaveHandle> {
        let mut handle = SaveHandle::none();
        for &key in keys {
            let value = match key {
                CollectionKey::Students => serde_json::to_value(&self.roster)?,
                CollectionKey::Attendance => serde_json::to_value(&self.ledger)?,
            };
            handle.tasks.push((key, self.spawn_save(key, value)));
        }
        Ok(handle)
    }

    fn spawn_save(&self, key: CollectionKey, value: Value) -> JoinHandle<Result<()>> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let result = store.save(key, value).await;
            if let Err(e) = &result {
                tracing::error!(key = %key, error = %e, "save failed; keeping local state");
            }
            result
        })
    }
}

async fn load_ledger<S: DocumentStore>(store: &S) -> Result<Ledger> {
    let key = CollectionKey::Attendance;
    match store.load(key).await? {
        None | Some(Value::Null) => Ok(Ledger::new()),
        Some(value) => {
            let snapshot: LedgerSnapshot =
                serde_json::from_value(value).map_err(|e| key.read_error(e))?;
            Ok(Ledger::from_snapshot(snapshot))
        }
    }
}

async fn load_roster<S: DocumentStore>(store: &S) -> Result<Roster> {
    let key = CollectionKey::Students;
    match store.load(key).await? {
        None | Some(Value::Null) => Ok(Roster::new()),
        Some(value) => {
            let students: Vec<Student> =
                serde_json::from_value(value).map_err(|e| key.read_error(e))?;
            Ok(Roster::from_students(students))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use attendance_core::notifications::NoticeLevel;
    use attendance_core::time_utils::{parse_date, FixedClock};
    use serde_json::json;

    async fn session(seed_demo: bool) -> (AttendanceSession<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let (session, notices) = AttendanceSession::load(Arc::clone(&store), seed_demo).await;
        assert!(notices.is_empty());
        (session, store)
    }

    #[tokio::test]
    async fn test_load_empty_store_seeds_demo() {
        let (session, store) = session(true).await;
        assert_eq!(session.roster().len(), 5);
        assert!(session.ledger().is_empty());

        let saved = store.get(CollectionKey::Students).await.unwrap();
        assert_eq!(saved.as_array().map(Vec::len), Some(5));
        assert_eq!(saved[0]["name"], "Alice Johnson");
    }

    #[tokio::test]
    async fn test_load_without_seed_stays_empty() {
        let (session, store) = session(false).await;
        assert!(session.roster().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_load_existing_documents() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(
                CollectionKey::Students,
                json!([{"name": "Alice", "id": "S001", "class": "ClassA"}]),
            )
            .await;
        store
            .insert(
                CollectionKey::Attendance,
                json!({
                    "2024-03-01": [{"name": "Alice", "status": "Late"}],
                    "not-a-date": [{"name": "Alice", "status": "Present"}]
                }),
            )
            .await;

        let (session, notices) = AttendanceSession::load(store, true).await;
        assert!(notices.is_empty());
        assert_eq!(session.roster().len(), 1);
        assert_eq!(
            session
                .ledger()
                .status_of(parse_date("2024-03-01").unwrap(), "Alice"),
            Some(AttendanceStatus::Late)
        );
        assert_eq!(session.ledger().record_count(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_yields_warnings_and_empty_state() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_loads(true);

        let (session, notices) = AttendanceSession::load(Arc::clone(&store), false).await;
        assert!(session.roster().is_empty());
        assert!(session.ledger().is_empty());
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == NoticeLevel::Warning));
        assert_eq!(
            notices[0].message,
            "Error loading attendance data. Using empty dataset."
        );
    }

    #[tokio::test]
    async fn test_malformed_document_is_read_warning() {
        let store = Arc::new(MemoryStore::new());
        store.insert(CollectionKey::Students, json!({"oops": 1})).await;

        let (session, notices) = AttendanceSession::load(store, false).await;
        assert!(session.roster().is_empty());
        assert_eq!(
            notices,
            vec![Notice::warning(
                "Error loading student data. Using default students."
            )]
        );
    }

    #[tokio::test]
    async fn test_mark_status_persists_ledger() {
        let (mut session, store) = session(true).await;

        let (notice, handle) = session
            .mark_status("2024-03-01", "Alice Johnson", AttendanceStatus::Late)
            .unwrap();
        assert_eq!(notice, Notice::warning("Alice Johnson marked late"));
        assert_eq!(handle.keys(), vec![CollectionKey::Attendance]);
        handle.wait().await.unwrap();

        assert_eq!(
            store.get(CollectionKey::Attendance).await,
            Some(json!({"2024-03-01": [{"name": "Alice Johnson", "status": "Late"}]}))
        );
    }

    #[tokio::test]
    async fn test_mark_twice_keeps_one_record() {
        let (mut session, store) = session(true).await;
        let (_, h1) = session
            .mark_status("2024-03-01", "Bob Smith", AttendanceStatus::Present)
            .unwrap();
        h1.wait().await.unwrap();
        let (notice, h2) = session
            .mark_status("2024-03-01", "Bob Smith", AttendanceStatus::Absent)
            .unwrap();
        h2.wait().await.unwrap();

        assert_eq!(notice.level, NoticeLevel::Danger);
        let doc = store.get(CollectionKey::Attendance).await.unwrap();
        assert_eq!(doc["2024-03-01"].as_array().map(Vec::len), Some(1));
        assert_eq!(doc["2024-03-01"][0]["status"], "Absent");
    }

    #[tokio::test]
    async fn test_mark_today_uses_clock() {
        let (mut session, _store) = session(true).await;
        let clock = FixedClock(parse_date("2024-05-06").unwrap());
        session
            .mark_today(&clock, "Emma Wilson", AttendanceStatus::Present)
            .unwrap()
            .1
            .wait()
            .await
            .unwrap();
        assert_eq!(
            session.ledger().status_of(clock.0, "Emma Wilson"),
            Some(AttendanceStatus::Present)
        );
    }

    #[tokio::test]
    async fn test_mark_rejects_unknown_student_and_bad_date() {
        let (mut session, store) = session(true).await;
        let saves_before = store.save_count();

        let err = session
            .mark_status("2024-03-01", "Nobody", AttendanceStatus::Present)
            .unwrap_err();
        assert!(matches!(err, AttendanceError::StudentNotFound(_)));

        let err = session
            .mark_status("2024-02-30", "Bob Smith", AttendanceStatus::Present)
            .unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidDate(_)));

        assert!(session.ledger().is_empty());
        assert_eq!(store.save_count(), saves_before);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_local_state() {
        let (mut session, store) = session(true).await;
        store.set_fail_saves(true);

        let (_, handle) = session
            .mark_status("2024-03-01", "Alice Johnson", AttendanceStatus::Present)
            .unwrap();
        let err = handle.wait().await.unwrap_err();

        assert_eq!(
            Notice::from_error(&err),
            Notice::danger("Error saving attendance data. Please try again.")
        );
        assert_eq!(
            session
                .ledger()
                .status_of(parse_date("2024-03-01").unwrap(), "Alice Johnson"),
            Some(AttendanceStatus::Present)
        );
        assert!(store.get(CollectionKey::Attendance).await.is_none());
    }

    #[tokio::test]
    async fn test_add_student_and_duplicate() {
        let (mut session, store) = session(false).await;

        let (notice, handle) = session
            .add_student(Student::new("  Frank ", "S006", "ClassC"))
            .unwrap();
        assert_eq!(notice, Notice::success("Student added successfully"));
        handle.wait().await.unwrap();
        assert_eq!(
            store.get(CollectionKey::Students).await,
            Some(json!([{"name": "Frank", "id": "S006", "class": "ClassC"}]))
        );

        let err = session
            .add_student(Student::new("Frank", "S007", "ClassA"))
            .unwrap_err();
        assert_eq!(Notice::from_error(&err), Notice::warning("Student already exists"));
        assert_eq!(session.roster().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_student_cascades_and_saves_both() {
        let (mut session, store) = session(true).await;
        for date in ["2024-03-01", "2024-03-02"] {
            session
                .mark_status(date, "Charlie Brown", AttendanceStatus::Absent)
                .unwrap()
                .1
                .wait()
                .await
                .unwrap();
        }
        session
            .mark_status("2024-03-02", "David Garcia", AttendanceStatus::Present)
            .unwrap()
            .1
            .wait()
            .await
            .unwrap();

        let (notice, handle) = session.remove_student("Charlie Brown").unwrap();
        assert_eq!(notice.message, "Student Charlie Brown removed successfully");
        assert_eq!(
            handle.keys(),
            vec![CollectionKey::Students, CollectionKey::Attendance]
        );
        handle.wait().await.unwrap();

        assert_eq!(session.roster().len(), 4);
        assert_eq!(session.ledger().record_count(), 1);
        assert_eq!(
            store.get(CollectionKey::Attendance).await,
            Some(json!({"2024-03-02": [{"name": "David Garcia", "status": "Present"}]}))
        );

        let err = session.remove_student("Charlie Brown").unwrap_err();
        assert_eq!(
            Notice::from_error(&err),
            Notice::warning("Student Charlie Brown not found")
        );
    }

    #[tokio::test]
    async fn test_apply_import() {
        let (mut session, store) = session(true).await;
        let report = attendance_data::import::import_students(
            "name,class\nGrace,ClassD\nBob Smith,ClassA\n".as_bytes(),
            session.roster(),
        )
        .unwrap();

        let (notice, handle) = session.apply_import(&report).unwrap();
        assert_eq!(
            notice.message,
            "1 students imported successfully. 1 duplicates skipped."
        );
        handle.wait().await.unwrap();
        assert_eq!(session.roster().len(), 6);
        let saved = store.get(CollectionKey::Students).await.unwrap();
        assert_eq!(saved[5]["name"], "Grace");
        assert_eq!(saved[5]["id"], "S006");
    }

    #[tokio::test]
    async fn test_apply_empty_import_writes_nothing() {
        let (mut session, store) = session(true).await;
        let saves_before = store.save_count();
        let (notice, handle) = session.apply_import(&ImportReport::default()).unwrap();
        assert!(handle.is_empty());
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(store.save_count(), saves_before);
    }

    #[tokio::test]
    async fn test_reload_round_trip() {
        let (mut session, store) = session(true).await;
        session
            .mark_status("2024-03-01", "Alice Johnson", AttendanceStatus::Present)
            .unwrap()
            .1
            .wait()
            .await
            .unwrap();
        session
            .add_student(Student::new("Heidi", "S006", "ClassA"))
            .unwrap()
            .1
            .wait()
            .await
            .unwrap();

        let (reloaded, notices) = AttendanceSession::load(store, true).await;
        assert!(notices.is_empty());
        assert_eq!(reloaded.roster(), session.roster());
        assert_eq!(reloaded.ledger(), session.ledger());
    }

    #[tokio::test]
    async fn test_detached_saves_still_complete() {
        let (mut session, store) = session(true).await;
        let saves_before = store.save_count();
        session
            .mark_status("2024-03-01", "Bob Smith", AttendanceStatus::Late)
            .unwrap()
            .1
            .detach();

        for _ in 0..50 {
            if store.save_count() > saves_before {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.save_count(), saves_before + 1);
    }
}
