// CSV export through filter, aggregation and company summary.

use std::io::Write;

use auditpaper_records::aggregate::{group_and_aggregate, GroupSpec, Reducer};
use auditpaper_records::model::{fields, SOURCE_REQUIRED_FIELDS};
use auditpaper_records::source::{load_csv, records_from_table, require_fields};
use auditpaper_records::{CompanySummary, DomainFilter, RecordError};

const EXPORT: &str = "\
TRADENAME,UIFREFERENCENUMBER,SHUTDOWN_FROM,SHUTDOWN_TILL,IDNUMBER,FIRSTNAME,LASTNAME,PAYMENT_STATUS_ID,PAYMENTMEDIUMID,BANK_PAY_AMOUNT
Acme Bakery,U1234567,27/03/2020,16/04/2020,7001015009087,Sipho,Zungu,3,2,\"1,200.00\"
Acme Bakery,U1234567,17/04/2020,30/04/2020,7001015009087,Sipho,Zungu,3,2,800.00
Acme Bakery,U1234567,27/03/2020,16/04/2020,8203040111082,Anna,Botha,3,2,950.50
Acme Bakery,U1234567,27/03/2020,16/04/2020,9105050222083,Piet,Adams,4,2,700.00
Acme Bakery,U1234567,27/03/2020,16/04/2020,9105050222083,Piet,Adams,3,1,700.00
Acme Bakery,U1234567,27/03/2020,16/04/2020,6607070333084,Lindi,Khumalo,3,2,0
";

fn write_export(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("export.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn export_to_employee_rows() {
    let dir = tempfile::tempdir().unwrap();
    let table = load_csv(&write_export(&dir, EXPORT)).unwrap();
    require_fields(&table, SOURCE_REQUIRED_FIELDS).unwrap();

    let all = records_from_table(&table);
    let kept = DomainFilter::default().apply(all.clone());
    assert_eq!(kept.len(), 3);

    let spec = GroupSpec::by(fields::IDNUMBER)
        .reduce(fields::FIRSTNAME, Reducer::First)
        .reduce(fields::LASTNAME, Reducer::First)
        .reduce(fields::BANK_PAY_AMOUNT, Reducer::Sum)
        .sorted_by(fields::LASTNAME);
    let rows = group_and_aggregate(&kept, &spec);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].text(fields::LASTNAME), "Botha");
    assert_eq!(rows[1].number(fields::BANK_PAY_AMOUNT), Some(2000.0));

    let summary = CompanySummary::from_records(all.first(), &kept);
    assert_eq!(summary.trade_name, "Acme Bakery");
    assert_eq!(summary.employee_count, 2);
    assert!((summary.total_amount - 2950.5).abs() < 1e-9);
    assert_eq!(summary.periods.len(), 2);
}

#[test]
fn missing_required_fields_listed() {
    let dir = tempfile::tempdir().unwrap();
    let table = load_csv(&write_export(&dir, "IDNUMBER,TRADENAME\n1,Acme\n")).unwrap();
    match require_fields(&table, SOURCE_REQUIRED_FIELDS) {
        Err(RecordError::MissingField { fields }) => {
            assert_eq!(fields.len(), 6);
            assert!(fields.contains(&"BANK_PAY_AMOUNT".to_string()));
            assert!(!fields.contains(&"IDNUMBER".to_string()));
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn unreadable_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, RecordError::Io(_)));
}
