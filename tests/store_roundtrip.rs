use patient_records::{
    FileStorage, MemoryStorage, Record, RecordStore, Table, TableStorage,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn field() -> impl Strategy<Value = String> {
    "[ -~\n]{0,16}"
}

fn record() -> impl Strategy<Value = Record> {
    (
        prop::collection::vec(field(), 13),
        "[0-9]{1,12}",
        "[0-9]{1,12}",
    )
        .prop_map(|(f, phone, aadhar)| Record {
            serial_no: f[0].clone(),
            photo_path: f[1].clone(),
            name: f[2].clone(),
            email: f[3].clone(),
            gender: f[4].clone(),
            age: f[5].clone(),
            address: f[6].clone(),
            phone_no: phone,
            occupation: f[7].clone(),
            aadhar_no: aadhar,
            symptoms: f[8].clone(),
            treatment: f[9].clone(),
            start_date: f[10].clone(),
            end_date: f[11].clone(),
            satisfied: f[12].clone(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn saved_table_loads_back_unchanged(rows in prop::collection::vec(record(), 0..8)) {
        let table = Table::from_rows(rows);

        let mut memory = MemoryStorage::new();
        memory.save(&table).unwrap();
        prop_assert_eq!(memory.read().unwrap(), table.clone());

        let tmp = TempDir::new().unwrap();
        let mut file = FileStorage::new(tmp.path().join("patients.csv"));
        file.save(&table).unwrap();
        prop_assert_eq!(file.read().unwrap(), table);
    }
}

#[test]
fn import_ten_then_three_external_rows() {
    let tmp = TempDir::new().unwrap();
    let mut store = RecordStore::open(tmp.path().join("patients.csv"));

    for serial in 1..=10u64 {
        let record = Record::new_registration(serial)
            .with(patient_records::Column::Name, format!("Patient {}", serial))
            .with(patient_records::Column::Email, "p@example.com")
            .with(patient_records::Column::Gender, "Female")
            .with(patient_records::Column::Age, "33")
            .with(patient_records::Column::PhoneNo, "0011223344");
        store.create(record).unwrap();
    }

    // Columns out of order, one unknown column, one Schema column missing
    let external = tmp.path().join("incoming.csv");
    std::fs::write(
        &external,
        "Name,Ward,SerialNo,PhoneNo\nRavi,3,1,007\nSita,4,1,008\nGopal,5,,009\n",
    )
    .unwrap();

    assert_eq!(store.import_file(&external).unwrap(), 3);

    let imported: Vec<(&str, &str, &str)> = store
        .snapshot()
        .iter()
        .skip(10)
        .map(|r| (r.serial_no.as_str(), r.name.as_str(), r.phone_no.as_str()))
        .collect();
    assert_eq!(
        imported,
        vec![("11", "Ravi", "007"), ("12", "Sita", "008"), ("13", "Gopal", "009")]
    );

    // The reload after import matches a fresh open of the same file
    let reopened = RecordStore::open(tmp.path().join("patients.csv"));
    assert_eq!(reopened.snapshot(), store.snapshot());
}

#[test]
fn unreadable_data_file_starts_empty_and_recovers_on_write() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("patients.csv");
    std::fs::write(&path, b"SerialNo,Name\n1,\xff\xfe\n").unwrap();

    let mut store = RecordStore::open(&path);
    assert!(store.is_empty());
    assert_eq!(store.next_serial().unwrap(), 1);

    let record = Record::new_registration(1)
        .with(patient_records::Column::Name, "Asha")
        .with(patient_records::Column::Email, "asha@example.com")
        .with(patient_records::Column::Gender, "Female")
        .with(patient_records::Column::Age, "29")
        .with(patient_records::Column::PhoneNo, "9876543210");
    store.create(record).unwrap();

    let reopened = RecordStore::open(&path);
    assert_eq!(reopened.len(), 1);
}
