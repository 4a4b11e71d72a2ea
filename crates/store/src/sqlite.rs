//! SQLite-backed task store.
//!
//! All state-changing writes commit immediately so a crash mid-phase leaves
//! durable partial progress rather than silent loss.

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;
use std::sync::Arc;

use taskforge_core::{
    derived_step_id,
    error::{Error, Result},
    traits::TaskStore,
    types::{
        SectionContent, Step, StepCompletion, StepStatus, Task, TaskMode, TaskPlan, TaskStatus,
    },
};

/// Task store over a single SQLite connection, held for the run's duration.
pub struct SqliteTaskStore {
    conn: Arc<tokio::sync::Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Open (or create) a task database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database. Used by tests and ephemeral runs.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                goal TEXT NOT NULL,
                mode TEXT NOT NULL,
                status TEXT NOT NULL,
                plan TEXT,
                research_content TEXT,
                final_report TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS task_steps (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                step_index INTEGER NOT NULL,
                thought TEXT NOT NULL DEFAULT '',
                action TEXT NOT NULL,
                action_input TEXT NOT NULL,
                observation TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                result TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (task_id) REFERENCES tasks (id) ON DELETE CASCADE
            )",
            [],
        )
        .map_err(db_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_task_steps_task ON task_steps (task_id)",
            [],
        )
        .map_err(db_err)?;

        Ok(Self {
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|e| Error::storage(e.to_string()))?
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::storage(e.to_string())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<(Task, String, String, String, String, String)> {
    Ok((
        Task {
            id: row.get(0)?,
            goal: row.get(1)?,
            mode: TaskMode::Plan, // replaced by the caller from the raw column
            status: TaskStatus::Planning,
            plan: TaskPlan::default(),
            research_content: BTreeMap::new(),
            final_report: String::new(),
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        },
        row.get(2)?, // mode
        row.get(3)?, // status
        row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    ))
}

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<(Step, String)> {
    Ok((
        Step {
            id: row.get(0)?,
            task_id: row.get(1)?,
            step_index: row.get(2)?,
            thought: row.get(3)?,
            action: row.get(4)?,
            action_input: row.get(5)?,
            observation: row.get(6)?,
            status: StepStatus::Running,
            result: row.get(8)?,
        },
        row.get(7)?, // status
    ))
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert_task(&self, task: &Task) -> Result<()> {
        let task = task.clone();
        let plan_json = serde_json::to_string(&task.plan)?;
        let content_json = serde_json::to_string(&task.research_content)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, goal, mode, status, plan, research_content, final_report, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    task.id,
                    task.goal,
                    task.mode.as_str(),
                    task.status.as_str(),
                    plan_json,
                    content_json,
                    task.final_report,
                    task.created_at,
                    task.updated_at,
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn load_task(&self, task_id: &str) -> Result<Option<Task>> {
        let id = task_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, goal, mode, status, plan, research_content, final_report, created_at, updated_at
                     FROM tasks WHERE id = ?1",
                )
                .map_err(db_err)?;

            let row = stmt
                .query_row(params![id], task_from_row)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(db_err(other)),
                })?;

            let Some((mut task, mode, status, plan, content, report)) = row else {
                return Ok(None);
            };

            task.mode = TaskMode::parse(&mode)
                .ok_or_else(|| Error::storage(format!("unknown task mode: {mode}")))?;
            task.status = TaskStatus::parse(&status)
                .ok_or_else(|| Error::storage(format!("unknown task status: {status}")))?;
            if !plan.is_empty() {
                task.plan = serde_json::from_str(&plan)?;
            }
            if !content.is_empty() {
                task.research_content = serde_json::from_str(&content)?;
            }
            task.final_report = report;
            Ok(Some(task))
        })
        .await
    }

    async fn task_status(&self, task_id: &str) -> Result<Option<TaskStatus>> {
        let id = task_id.to_string();
        self.with_conn(move |conn| {
            let status: Option<String> = conn
                .query_row("SELECT status FROM tasks WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(db_err(other)),
                })?;

            match status {
                Some(s) => TaskStatus::parse(&s)
                    .map(Some)
                    .ok_or_else(|| Error::storage(format!("unknown task status: {s}"))),
                None => Ok(None),
            }
        })
        .await
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        let id = task_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn set_plan(&self, task_id: &str, plan: &TaskPlan) -> Result<()> {
        let id = task_id.to_string();
        let plan_json = serde_json::to_string(plan)?;
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET plan = ?1 WHERE id = ?2",
                params![plan_json, id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn set_plan_and_status(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        status: TaskStatus,
    ) -> Result<()> {
        let id = task_id.to_string();
        let plan_json = serde_json::to_string(plan)?;
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET plan = ?1, status = ?2 WHERE id = ?3",
                params![plan_json, status.as_str(), id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn set_final_report(&self, task_id: &str, report: &str) -> Result<()> {
        let id = task_id.to_string();
        let report = report.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET final_report = ?1 WHERE id = ?2",
                params![report, id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn set_research_artifacts(
        &self,
        task_id: &str,
        plan: &TaskPlan,
        research_content: &BTreeMap<String, SectionContent>,
        report: &str,
    ) -> Result<()> {
        let id = task_id.to_string();
        let plan_json = serde_json::to_string(plan)?;
        let content_json = serde_json::to_string(research_content)?;
        let report = report.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET plan = ?1, research_content = ?2, final_report = ?3 WHERE id = ?4",
                params![plan_json, content_json, report, id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn finalize_task(
        &self,
        task_id: &str,
        status: TaskStatus,
        report: &str,
        updated_at: i64,
    ) -> Result<()> {
        let id = task_id.to_string();
        let report = report.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE tasks SET status = ?1, final_report = ?2, updated_at = ?3 WHERE id = ?4",
                params![status.as_str(), report, updated_at, id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn save_step_with_id(
        &self,
        task_id: &str,
        step_id: &str,
        action: &str,
        action_input: &str,
        status: StepStatus,
        result: &str,
    ) -> Result<Step> {
        let task_id = task_id.to_string();
        let step_id = step_id.to_string();
        let action = action.to_string();
        let action_input = action_input.to_string();
        let result = result.to_string();

        self.with_conn(move |conn| {
            // Index assignment and insert share the connection lock, so the
            // count cannot race with another step write for this task.
            let count: u32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM task_steps WHERE task_id = ?1",
                    params![task_id],
                    |row| row.get(0),
                )
                .map_err(db_err)?;
            let step_index = count + 1;

            conn.execute(
                "INSERT INTO task_steps (id, task_id, step_index, action, action_input, status, result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    step_id,
                    task_id,
                    step_index,
                    action,
                    action_input,
                    status.as_str(),
                    result,
                ],
            )
            .map_err(db_err)?;

            Ok(Step {
                id: step_id,
                task_id,
                step_index,
                thought: String::new(),
                action,
                action_input,
                observation: String::new(),
                status,
                result,
            })
        })
        .await
    }

    async fn update_step(&self, step_id: &str, completion: &StepCompletion) -> Result<()> {
        let id = step_id.to_string();
        let c = completion.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE task_steps
                 SET thought = ?1, action = ?2, action_input = ?3, observation = ?4, status = ?5, result = ?6
                 WHERE id = ?7",
                params![
                    c.thought,
                    c.action,
                    c.action_input,
                    c.observation,
                    StepStatus::Completed.as_str(),
                    c.result,
                    id,
                ],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn update_step_result(&self, task_id: &str, action: &str, result: &str) -> Result<()> {
        let id = derived_step_id(task_id, action);
        let result = result.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE task_steps SET result = ?1 WHERE id = ?2",
                params![result, id],
            )
            .map_err(db_err)?;
            Ok(())
        })
        .await
    }

    async fn list_steps(&self, task_id: &str) -> Result<Vec<Step>> {
        let id = task_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, task_id, step_index, thought, action, action_input, observation, status, result
                     FROM task_steps WHERE task_id = ?1 ORDER BY step_index ASC",
                )
                .map_err(db_err)?;

            let rows = stmt
                .query_map(params![id], step_from_row)
                .map_err(db_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_err)?;

            rows.into_iter()
                .map(|(mut step, status)| {
                    step.status = StepStatus::parse(&status)
                        .ok_or_else(|| Error::storage(format!("unknown step status: {status}")))?;
                    Ok(step)
                })
                .collect()
        })
        .await
    }

    async fn count_steps(&self, task_id: &str) -> Result<u32> {
        let id = task_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM task_steps WHERE task_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(db_err)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_core::now_millis;

    fn make_task(id: &str, mode: TaskMode) -> Task {
        Task {
            id: id.to_string(),
            goal: "test goal".to_string(),
            mode,
            status: TaskStatus::Planning,
            plan: TaskPlan::default(),
            research_content: BTreeMap::new(),
            final_report: String::new(),
            created_at: now_millis(),
            updated_at: now_millis(),
        }
    }

    #[tokio::test]
    async fn test_task_roundtrip() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.insert_task(&make_task("t1", TaskMode::Write)).await.unwrap();

        let loaded = store.load_task("t1").await.unwrap().unwrap();
        assert_eq!(loaded.goal, "test goal");
        assert_eq!(loaded.mode, TaskMode::Write);
        assert_eq!(loaded.status, TaskStatus::Planning);
        assert!(loaded.plan.is_empty());

        assert!(store.load_task("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_step_indices_strictly_increase() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.insert_task(&make_task("t1", TaskMode::Plan)).await.unwrap();

        for i in 0..5 {
            let step = store
                .save_step_with_id("t1", &format!("s{i}"), "Phase", "{}", StepStatus::Completed, "{}")
                .await
                .unwrap();
            assert_eq!(step.step_index, i + 1);
        }

        let steps = store.list_steps("t1").await.unwrap();
        let indices: Vec<u32> = steps.iter().map(|s| s.step_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_two_write_step_lifecycle() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.insert_task(&make_task("t1", TaskMode::Plan)).await.unwrap();

        store
            .save_step_with_id("t1", "s1", "Planning...", "{}", StepStatus::Running, "")
            .await
            .unwrap();

        let steps = store.list_steps("t1").await.unwrap();
        assert_eq!(steps[0].status, StepStatus::Running);

        store
            .update_step(
                "s1",
                &StepCompletion {
                    thought: "think".into(),
                    action: "retrieve_knowledge".into(),
                    action_input: r#"{"query":"q"}"#.into(),
                    observation: "obs".into(),
                    result: "## Result".into(),
                },
            )
            .await
            .unwrap();

        let steps = store.list_steps("t1").await.unwrap();
        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[0].action, "retrieve_knowledge");
        assert_eq!(steps[0].observation, "obs");
        // The in-place update must not have bumped the index.
        assert_eq!(steps[0].step_index, 1);
        assert_eq!(store.count_steps("t1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_step_result_by_derived_id() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.insert_task(&make_task("t1", TaskMode::Write)).await.unwrap();

        let action = "Phase 1: Generate Elaboration";
        let id = derived_step_id("t1", action);
        store
            .save_step_with_id("t1", &id, action, "{}", StepStatus::Completed, "old")
            .await
            .unwrap();

        store.update_step_result("t1", action, "new").await.unwrap();

        let steps = store.list_steps("t1").await.unwrap();
        assert_eq!(steps[0].result, "new");
    }

    #[tokio::test]
    async fn test_finalize_and_status() {
        let store = SqliteTaskStore::in_memory().unwrap();
        store.insert_task(&make_task("t1", TaskMode::Explore)).await.unwrap();

        store.set_status("t1", TaskStatus::Running).await.unwrap();
        assert_eq!(
            store.task_status("t1").await.unwrap(),
            Some(TaskStatus::Running)
        );

        store
            .finalize_task("t1", TaskStatus::Completed, "report body", 42)
            .await
            .unwrap();

        let task = store.load_task("t1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.final_report, "report body");
        assert_eq!(task.updated_at, 42);
    }

    #[tokio::test]
    async fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let store = SqliteTaskStore::open(&path).unwrap();
        store.insert_task(&make_task("t1", TaskMode::Debate)).await.unwrap();
        assert!(store.load_task("t1").await.unwrap().is_some());
    }
}
