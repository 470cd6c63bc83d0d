use rowdb::config::TableConfig;
use rowdb::error::RowDbError;
use rowdb::row::Row;
use rowdb::btree::ops::BTree;
use rowdb::storage::page::PAGE_SIZE;
use rowdb::storage::pager::Pager;
use rowdb::Table;
use tempfile::TempDir;

fn row(id: u32) -> Row {
    Row::new(id, format!("name_{:03}", id), format!("{}@example.com", id)).unwrap()
}

#[test]
fn test_rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    let written: Vec<Row> = [17u32, 3, 25, 8, 1, 12].iter().map(|&id| row(id)).collect();
    {
        let mut table = Table::open(&path).unwrap();
        for r in &written {
            table.insert(r.id, r).unwrap();
        }
        table.close().unwrap();
    }
    assert_eq!(std::fs::metadata(&path).unwrap().len(), PAGE_SIZE as u64);

    // Stored cells hold exactly the encoded rows.
    {
        let config = TableConfig::default();
        let mut pager = Pager::open(&path, &config).unwrap();
        let btree = BTree::open(&mut pager, &config).unwrap();
        for r in &written {
            let cursor = btree.find(&mut pager, r.id).unwrap();
            assert_eq!(cursor.value(&mut pager).unwrap(), &r.to_bytes()[..]);
        }
    }

    let mut table = Table::open(&path).unwrap();
    let mut expected = written.clone();
    expected.sort_by_key(|r| r.id);
    assert_eq!(table.select_all().unwrap(), expected);

    // The reopened table keeps accepting inserts and rejecting duplicates.
    assert!(matches!(
        table.insert(8, &row(8)),
        Err(RowDbError::DuplicateKey(8))
    ));
    table.insert(9, &row(9)).unwrap();
    table.close().unwrap();

    let mut table = Table::open(&path).unwrap();
    let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 8, 9, 12, 17, 25]);
}

#[test]
fn test_unflushed_rows_are_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");

    {
        let mut table = Table::open(&path).unwrap();
        table.insert(1, &row(1)).unwrap();
        table.flush().unwrap();
        table.insert(2, &row(2)).unwrap();
        // dropped without close
    }

    let mut table = Table::open(&path).unwrap();
    let ids: Vec<u32> = table.select_all().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn test_split_tree_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let config = TableConfig::default().with_leaf_max_cells(4);

    {
        let mut table = Table::open_with_config(&path, config).unwrap();
        for id in 1..=5 {
            table.insert(id, &row(id)).unwrap();
        }
        table.close().unwrap();
    }
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        3 * PAGE_SIZE as u64
    );

    let mut table = Table::open_with_config(&path, config).unwrap();
    assert_eq!(table.page_count(), 3);
    let expected = "\
- internal (size 1)
  - leaf (size 3)
    - 1
    - 2
    - 3
  - key 3
  - leaf (size 2)
    - 4
    - 5
";
    assert_eq!(table.dump_tree().unwrap(), expected);
}

#[test]
fn test_corrupt_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    std::fs::write(&path, vec![0u8; PAGE_SIZE - 1]).unwrap();

    assert!(matches!(
        Table::open(&path),
        Err(RowDbError::Corruption(_))
    ));
}

#[test]
fn test_unknown_node_type_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let mut bytes = vec![0u8; PAGE_SIZE];
    bytes[0] = 0x7F;
    std::fs::write(&path, bytes).unwrap();

    let mut table = Table::open(&path).unwrap();
    assert!(matches!(
        table.find(1),
        Err(RowDbError::InvalidNodeType { page: 0, tag: 0x7F })
    ));
}

#[test]
fn test_oversized_cell_count_is_corruption() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let mut bytes = vec![0u8; PAGE_SIZE];
    bytes[0] = 1; // leaf
    bytes[1] = 1; // root
    bytes[6..10].copy_from_slice(&1000u32.to_le_bytes());
    std::fs::write(&path, bytes).unwrap();

    let mut table = Table::open(&path).unwrap();
    assert!(matches!(table.find(1), Err(RowDbError::Corruption(_))));
    assert!(matches!(table.table_start(), Err(RowDbError::Corruption(_))));
    assert!(matches!(table.select_all(), Err(RowDbError::Corruption(_))));
    assert!(matches!(table.dump_tree(), Err(RowDbError::Corruption(_))));
}
