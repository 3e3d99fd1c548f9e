use chrono::NaiveDate;
use patient_records::{
    build_view, create_backup, export_rows, read_external, summarize, Column, DuplicateResolver,
    Record, RecordPatch, RecordStore, StoreError, ViewQuery,
};
use tempfile::TempDir;

fn create_test_record(name: &str, gender: &str, age: &str) -> Record {
    Record::default()
        .with(Column::Name, name)
        .with(Column::Email, format!("{}@clinic.in", name.to_lowercase()))
        .with(Column::Gender, gender)
        .with(Column::Age, age)
        .with(Column::PhoneNo, "0044556677")
}

#[test]
fn register_search_dedupe_and_export() {
    let tmp = TempDir::new().unwrap();
    let mut store = RecordStore::open(tmp.path().join("patients.csv"));

    for (name, gender, age) in [
        ("Kavya", "Female", "31"),
        ("Rohan", "Male", "45"),
        ("Kavya", "Female", "31"),
        ("Imran", "Male", "bad"),
    ] {
        let serial = store.next_serial().unwrap();
        let record = create_test_record(name, gender, age).with(Column::SerialNo, serial.to_string());
        store.create(record).unwrap();
    }
    assert_eq!(store.len(), 4);

    // Registration with a taken serial is refused and changes nothing
    let before = store.snapshot_owned();
    let clash = create_test_record("Nina", "Female", "20").with(Column::SerialNo, "2");
    assert!(matches!(store.create(clash), Err(StoreError::Conflict(_))));
    assert_eq!(store.snapshot(), &before);

    let males = build_view(
        store.snapshot(),
        &ViewQuery::new().filter(Column::Gender, "Male").sort_by(Column::Name),
    );
    assert_eq!(males.serials(), vec!["4", "2"]);

    let groups = DuplicateResolver::new().find_groups(store.snapshot());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].serials(), vec!["1", "3"]);

    // Resolve by giving the second copy a distinct email
    store
        .update("3", &RecordPatch::new().set(Column::Email, "kavya.b@clinic.in"))
        .unwrap();
    assert!(DuplicateResolver::new().find_groups(store.snapshot()).is_empty());

    let summary = summarize(store.snapshot());
    assert_eq!(summary.total, 4);
    assert_eq!(summary.gender.male, 2);
    assert_eq!(summary.average_age, Some((31.0 + 45.0 + 31.0) / 3.0));

    let xlsx = tmp.path().join("patients.xlsx");
    assert_eq!(export_rows(&xlsx, store.snapshot().rows()).unwrap(), 4);
    let back = read_external(&xlsx).unwrap();
    assert_eq!(back.len(), 4);
    assert_eq!(back.rows()[0].phone_no, "0044556677");

    let when = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    let report = create_backup(&tmp.path().join("patients.csv"), &tmp.path().join("bk"), when).unwrap();
    assert!(report
        .path
        .ends_with("bk/patients_backup_20240102_030405.csv"));
}
