//! API tests

use vmsim_api::{DataType, Error, PageMapping, RegionInfo};

#[test]
fn test_error_display() {
    assert_eq!(
        Error::AllocationExceedsCapacity(4096).to_string(),
        "allocation of 4096 bytes exceeds available space"
    );
    assert_eq!(Error::UnknownProcess(1030).to_string(), "process 1030 not found");
    assert_eq!(
        Error::UnmappedTranslation { pid: 1024, address: 0x400 }.to_string(),
        "address 0x00000400 of process 1024 is not mapped"
    );
    assert_eq!(Error::InvalidType("quad".into()).to_string(), "invalid data type: quad");
}

#[test]
fn test_region_info_helpers() {
    let region = RegionInfo {
        name: "point".into(),
        address: 0x100,
        size: 24,
        data_type: Some(DataType::Double),
    };
    assert!(!region.is_free());
    assert_eq!(region.element_count(), 3);

    let free = RegionInfo {
        name: "<FREE_SPACE>".into(),
        address: 0x118,
        size: 100,
        data_type: None,
    };
    assert!(free.is_free());
    assert_eq!(free.element_count(), 0);
}

#[test]
fn test_page_mapping_ordering() {
    let mut mappings = vec![
        PageMapping { pid: 1025, page: 0, frame: 3 },
        PageMapping { pid: 1024, page: 2, frame: 1 },
        PageMapping { pid: 1024, page: 0, frame: 2 },
    ];
    mappings.sort();
    let keys: Vec<(u32, usize)> = mappings.iter().map(|m| (m.pid, m.page)).collect();
    assert_eq!(keys, vec![(1024, 0), (1024, 2), (1025, 0)]);
}

#[cfg(feature = "serde")]
#[test]
fn test_serialize_region() {
    let region = RegionInfo {
        name: "count".into(),
        address: 0,
        size: 4,
        data_type: Some(DataType::Int),
    };
    let json = serde_json::to_string(&region).unwrap();
    assert_eq!(json, r#"{"name":"count","address":0,"size":4,"data_type":"int"}"#);
}
