use sql_console::backend::Backend;
use sql_console::console::{QueryOutcome, Session};
use sql_console::error::{ConsoleError, IngestionError};
use sql_console::ingestion::{CellValue, IngestionPipeline, TabularSource};
use sql_console::viz::{self, ChartSuggestion};

fn rows(outcome: QueryOutcome) -> sql_console::ResultSet {
    match outcome {
        QueryOutcome::Rows(result) => result,
        QueryOutcome::Affected(n) => panic!("expected rows, got {} affected", n),
    }
}

#[test]
fn test_convert_upload_then_query() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"{"employees": [{"Full Name": "A", "Salary": 50000}, {"Full Name": "B", "Salary": 60000}]}"#;
    let source = TabularSource::from_bytes("staff.json", json.as_bytes().to_vec()).unwrap();

    let mut session = Session::new();
    let converted = session
        .convert_upload(&IngestionPipeline::new(), source, "staff", None, dir.path())
        .unwrap();
    assert_eq!(converted.row_count, 2);
    assert!(matches!(session.backend(), Some(Backend::UploadedFile { .. })));

    let actions = session.quick_actions().unwrap();
    assert_eq!(actions.len(), 4);
    assert_eq!(actions[0].query, "SELECT * FROM \"staff\" LIMIT 100;");

    let result = rows(
        session
            .execute("SELECT Full_Name, Salary FROM staff ORDER BY Salary DESC")
            .unwrap(),
    );
    assert_eq!(result.columns(), &["Full_Name", "Salary"]);
    assert_eq!(
        result.rows()[0],
        vec![CellValue::Text("B".to_string()), CellValue::Integer(60000)]
    );
    assert_eq!(result.to_csv().unwrap(), "Full_Name,Salary\nB,60000\nA,50000\n");

    assert_eq!(session.table_summaries().unwrap(), vec![("staff".to_string(), 2)]);
}

#[test]
fn test_failed_upload_keeps_session_disconnected() {
    let dir = tempfile::tempdir().unwrap();
    let source = TabularSource::from_bytes("list.json", b"[1, 2, 3]".to_vec()).unwrap();

    let mut session = Session::new();
    let err = session
        .convert_upload(&IngestionPipeline::new(), source, "t", None, dir.path())
        .unwrap_err();
    assert!(matches!(
        err,
        ConsoleError::Ingestion(IngestionError::UnsupportedJsonShape(_))
    ));
    assert!(!session.is_connected());
    assert!(matches!(session.execute("SELECT 1"), Err(ConsoleError::NotConnected)));
}

#[test]
fn test_sample_session_history_and_charts() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    let tables = session
        .connect(Backend::SampleData {
            path: dir.path().join("sample.db"),
        })
        .unwrap();
    assert_eq!(tables, vec!["employees", "departments"]);

    for action in session.quick_actions().unwrap() {
        session.select_quick_action(&action);
        session.execute_current().unwrap();
    }
    // Re-running a query does not duplicate it in history.
    session.execute("SELECT * FROM employees;").unwrap();
    assert_eq!(session.history().len(), 5);
    assert_eq!(
        session.recent_history(2),
        vec!["PRAGMA table_info(employees);", "SELECT e.name, e.salary, d.budget FROM employees e JOIN departments d ON e.department = d.name;"]
    );

    let affected = session
        .execute("UPDATE employees SET salary = salary + 1 WHERE department = 'Engineering'")
        .unwrap();
    assert_eq!(affected, QueryOutcome::Affected(2));

    let result = rows(session.execute("SELECT name, department, salary FROM employees").unwrap());
    let charts = viz::suggest(&result);
    assert_eq!(charts[0], ChartSuggestion::SummaryStats);
    assert!(charts.contains(&ChartSuggestion::BarChart {
        column: "department".to_string()
    }));

    assert!(matches!(session.execute("   "), Err(ConsoleError::EmptyQuery)));
}
