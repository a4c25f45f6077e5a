use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;
use catalog_pager::service::CatalogService;
use catalog_pager::{
    sort_catalog, CatalogError, Config, PageRequest, PaginatedReader, Product, SortKey, SorterConfig,
};

/// Helper to write a raw catalog into a fresh temporary directory
fn create_source(temp_dir: &TempDir, content: &str) -> Result<PathBuf> {
    let source = temp_dir.path().join("products.csv");
    fs::write(&source, content)?;
    Ok(source)
}

/// Helper to build a larger catalog with repeated names and prices
fn generated_catalog(count: i64) -> String {
    let names = ["Sprocket", "Anvil", "Gear", "Bolt", "Washer"];
    let mut lines = vec!["id,name,price".to_string()];
    for i in 0..count {
        let id = (i * 37) % count + 1;
        lines.push(format!("{},{},{}.{:02}", id, names[(i % 5) as usize], (i * 13) % 9, (i * 7) % 100));
        if i % 25 == 0 {
            lines.push(format!("{},Broken", id));
        }
    }
    lines.join("\n")
}

async fn read_all_pages(reader: &PaginatedReader, key: &str, page_size: i64) -> Result<Vec<Product>> {
    let mut records = Vec::new();
    let mut page_number = 1;
    loop {
        match reader.get_page(key, page_number, page_size).await {
            Ok(page) => {
                if page.records.is_empty() {
                    break;
                }
                records.extend(page.records);
                page_number += 1;
            }
            Err(CatalogError::PageOutOfRange { .. }) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(records)
}

fn sorted_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("sorted")
}

fn assert_ordered(records: &[Product], key: SortKey) {
    for pair in records.windows(2) {
        assert_ne!(key.compare(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
    }
}

#[tokio::test]
async fn test_end_to_end_price_page() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = create_source(&temp_dir, "1,Bolt,2.50\n2,Anvil,15.00\n3,Wrench,9.75\n")?;
    let target = sorted_dir(&temp_dir);

    sort_catalog(&source, &target, SorterConfig::default()).await?;

    let reader = PaginatedReader::new(&target);
    let page = reader.get_page("price", 1, 2).await?;

    let names: Vec<&str> = page.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Bolt", "Wrench"]);
    assert_eq!(page.records[0].price.to_string(), "2.50");
    assert_eq!(page.records[1].price.to_string(), "9.75");
    assert_eq!(page.meta.total_count, 3);
    assert_eq!(page.meta.total_pages, 2);

    Ok(())
}

#[tokio::test]
async fn test_malformed_line_skipped_everywhere() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = create_source(&temp_dir, "1,Bolt,2.50\nabc,Widget,9.99\n2,Gizmo,oops\n3,Wrench,9.75\n")?;
    let target = sorted_dir(&temp_dir);

    let report = sort_catalog(&source, &target, SorterConfig::default()).await?;
    assert_eq!(report.records_accepted, 2);
    assert_eq!(report.records_rejected, 1);
    assert_eq!(report.non_record_lines, 1);

    for key in SortKey::ALL {
        let content = fs::read_to_string(target.join(key.file_name()))?;
        assert!(!content.contains("Widget"));
        assert!(!content.contains("Gizmo"));
        assert_eq!(content.lines().count(), 2);
    }

    Ok(())
}

#[tokio::test]
async fn test_pagination_covers_every_batch_size() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = create_source(&temp_dir, &generated_catalog(120))?;

    let mut reference: Option<Vec<Vec<Product>>> = None;
    for batch_size in [1, 9, 64, 500] {
        let target = temp_dir.path().join(format!("sorted_{}", batch_size));
        let mut config = SorterConfig::with_batch_size(batch_size);
        config.merge_fan_in = 4;
        let report = sort_catalog(&source, &target, config).await?;
        assert_eq!(report.records_accepted, 120);
        assert_eq!(report.records_rejected, 5);

        let reader = PaginatedReader::new(&target);
        let mut orderings = Vec::new();
        for key in SortKey::ALL {
            let records = read_all_pages(&reader, key.as_str(), 13).await?;
            assert_eq!(records.len(), 120);
            assert_ordered(&records, key);
            orderings.push(records);
        }

        match &reference {
            Some(expected) => assert_eq!(&orderings, expected, "batch size {}", batch_size),
            None => reference = Some(orderings),
        }
    }

    Ok(())
}

#[tokio::test]
async fn test_reader_tolerates_missing_and_empty_derivatives() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target = sorted_dir(&temp_dir);
    let reader = PaginatedReader::new(&target);

    assert!(matches!(
        reader.fetch(&PageRequest::default()).await,
        Err(CatalogError::DerivativeMissing { .. })
    ));

    let source = create_source(&temp_dir, "id,name,price\n")?;
    sort_catalog(&source, &target, SorterConfig::default()).await?;

    let page = reader.fetch(&PageRequest::default()).await?;
    assert!(page.records.is_empty());
    assert!(matches!(
        reader.get_page("id", 5, 10).await,
        Err(CatalogError::PageOutOfRange { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_resort_replaces_derivatives() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = create_source(&temp_dir, "1,Bolt,2.50\n")?;
    let target = sorted_dir(&temp_dir);
    sort_catalog(&source, &target, SorterConfig::default()).await?;

    fs::write(&source, "7,Cog,0.10\n6,Anvil,3.00\n")?;
    sort_catalog(&source, &target, SorterConfig::default()).await?;

    let reader = PaginatedReader::new(&target);
    let page = reader.get_page("id", 1, 10).await?;
    let ids: Vec<i64> = page.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![6, 7]);

    Ok(())
}

#[tokio::test]
async fn test_service_from_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source = create_source(&temp_dir, "1,Bolt,2.50\n2,Anvil,15.00\n3,Wrench,9.75\n")?;
    let config_path = temp_dir.path().join("catalog_config.json");

    let mut config = Config::default();
    config.source_file = source;
    config.data_directory = sorted_dir(&temp_dir);
    config.sorter.batch_size = 2;
    config.save(&config_path).await?;

    let loaded = Config::load(&config_path).await?;
    let service = CatalogService::new(&loaded, Arc::new(AtomicBool::new(false)))?;
    service.startup().await?;

    let response = service.handle_line(r#"{"sortKey": "name", "pageSize": 500}"#).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["pageSize"], 100);
    assert_eq!(response.body["records"][0]["name"], "Anvil");

    assert!(data_dir_has_manifest(&loaded.data_directory));
    Ok(())
}

fn data_dir_has_manifest(dir: &Path) -> bool {
    catalog_pager::external_sort::SortManifest::exists(dir)
}
