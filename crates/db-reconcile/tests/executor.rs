mod common;

use common::FakeConnection;
use db_reconcile::prelude::*;

fn int() -> SqlType {
    SqlType::Int { unsigned: false }
}

fn students() -> TableModel {
    TableModel::new("students")
        .column(ColumnModel::new("id", int()).primary_key().auto_increment())
        .column(ColumnModel::new("name", SqlType::Varchar(50)))
}

fn add(table: &str, column: &str) -> Operation {
    Operation::add_column(
        table,
        ColumnModel::new(column, SqlType::Varchar(20)),
        ColumnPosition::First,
    )
}

#[tokio::test]
async fn test_create_table_with_checks_toggled() {
    let target = FakeConnection::target(vec![]);
    let report = SyncExecutor::new(&target)
        .execute(&[Operation::create_table(students())])
        .await
        .unwrap();

    assert_eq!(report.created_tables, 1);
    assert!(report.is_success());

    let executed = target.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[0], "SET FOREIGN_KEY_CHECKS=0");
    assert!(executed[1].starts_with("CREATE TABLE `students`"));
    assert_eq!(executed[2], "SET FOREIGN_KEY_CHECKS=1");
}

#[tokio::test]
async fn test_failure_does_not_stop_the_run() {
    let target = FakeConnection::target(vec![students()])
        .reject("ADD COLUMN `broken`", "Invalid default value for 'broken'");
    let operations = vec![
        add("students", "broken"),
        add("students", "email"),
        Operation::create_table(TableModel::new("prodi").column(ColumnModel::new("id", int()))),
    ];

    let report = SyncExecutor::new(&target).execute(&operations).await.unwrap();

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.table, "students");
    assert_eq!(failure.column.as_deref(), Some("broken"));
    assert!(failure.message.contains("Invalid default value"));
    assert!(failure.statement.as_deref().unwrap().contains("`broken`"));

    assert_eq!(report.altered_columns, 1);
    assert_eq!(report.created_tables, 1);
    assert_eq!(
        report.applied,
        vec!["add column `students`.`email`", "create table `prodi`"]
    );
}

#[tokio::test]
async fn test_checks_restored_when_everything_fails() {
    let target = FakeConnection::target(vec![]).reject("ALTER TABLE", "Table doesn't exist");
    let report = SyncExecutor::new(&target)
        .execute(&[add("a", "x"), add("b", "y")])
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        target.executed().last().map(String::as_str),
        Some("SET FOREIGN_KEY_CHECKS=1")
    );
}

#[tokio::test]
async fn test_cannot_disable_checks_is_fatal() {
    let target = FakeConnection::target(vec![])
        .reject("SET FOREIGN_KEY_CHECKS=0", "Access denied");
    let result = SyncExecutor::new(&target)
        .execute(&[Operation::create_table(students())])
        .await;

    assert!(matches!(
        result,
        Err(SyncError::ForeignKeyChecks { value: 0, .. })
    ));
    assert_eq!(target.executed(), vec!["SET FOREIGN_KEY_CHECKS=0"]);
}

#[tokio::test]
async fn test_missing_index_is_created_and_retried() {
    let target = FakeConnection::target(vec![]).reject_once(
        "ADD CONSTRAINT",
        "Failed to add the foreign key constraint. Missing index for constraint \
         'fk_kelas_dosen_nidn' in the referenced table 'dosen'",
    );
    let fk = ForeignKeyModel::new("kelas", "nidn", "dosen", "nidn");

    let report = SyncExecutor::new(&target)
        .execute(&[Operation::attach_foreign_key("kelas", fk)])
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.attached_constraints, 1);

    let executed = target.executed();
    assert_eq!(executed.len(), 5);
    assert!(executed[1].contains("ADD CONSTRAINT `fk_kelas_dosen_nidn`"));
    assert_eq!(executed[2], "ALTER TABLE `dosen` ADD INDEX (`nidn`)");
    assert_eq!(executed[3], executed[1]);
}

#[tokio::test]
async fn test_other_constraint_errors_are_not_retried() {
    let target = FakeConnection::target(vec![])
        .reject("ADD CONSTRAINT", "Cannot add or update a child row");
    let fk = ForeignKeyModel::new("kelas", "nidn", "dosen", "nidn");

    let report = SyncExecutor::new(&target)
        .execute(&[Operation::attach_foreign_key("kelas", fk)])
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(target.executed().len(), 3);
}

#[tokio::test]
async fn test_special_table_expanded_at_execution() {
    let legacy = TableModel::new("dosen")
        .column(ColumnModel::new("id", int()).primary_key())
        .column(ColumnModel::new("nidn", SqlType::Char(10)).not_null())
        .column(ColumnModel::new("nama_dosen", SqlType::Varchar(100)).not_null());
    let source = TableModel::new("dosen")
        .column(ColumnModel::new("id", int()).primary_key())
        .column(ColumnModel::new("nidn", SqlType::Char(10)).not_null())
        .column(ColumnModel::new("nama", SqlType::Varchar(100)).not_null());

    let target = FakeConnection::target(vec![legacy]).with_index("dosen", "idx_dosen_nidn");
    let report = SyncExecutor::new(&target)
        .execute(&[Operation::Special { table: source }])
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.altered_columns, 1);
    assert_eq!(
        target.executed()[1],
        "ALTER TABLE `dosen` CHANGE COLUMN `nama_dosen` `nama` varchar(100) NOT NULL"
    );
}

#[tokio::test]
async fn test_special_table_read_failure_is_isolated() {
    let target = FakeConnection::target(vec![TableModel::new("dosen")]).break_table("dosen");
    let report = SyncExecutor::new(&target)
        .execute(&[
            Operation::Special {
                table: TableModel::new("dosen"),
            },
            Operation::create_table(students()),
        ])
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].operation, "reconcile special table `dosen`");
    assert_eq!(report.created_tables, 1);
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let target = FakeConnection::target(vec![]);
    let report = SyncExecutor::new(&target)
        .dry_run(true)
        .execute(&[Operation::create_table(students())])
        .await
        .unwrap();

    assert_eq!(report.created_tables, 1);
    assert!(target.executed().is_empty());
}

#[tokio::test]
async fn test_sql_for_plans_special_tables() {
    let source = TableModel::new("dosen")
        .column(ColumnModel::new("id", int()).primary_key())
        .column(ColumnModel::new("nidn", SqlType::Char(10)).not_null());
    let target = FakeConnection::target(vec![]);

    let sql = SyncExecutor::new(&target)
        .sql_for(&[Operation::Special { table: source }])
        .await
        .unwrap();

    assert_eq!(sql.len(), 2);
    assert!(sql[0].starts_with("CREATE TABLE `dosen`"));
    assert_eq!(
        sql[1],
        "ALTER TABLE `dosen` ADD UNIQUE INDEX `idx_dosen_nidn` (`nidn`)"
    );
    assert!(target.executed().is_empty());
}
