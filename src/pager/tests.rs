#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use tempfile::tempdir;
    use crate::constants::*;
    use crate::error::CatalogError;
    use crate::external_sort::Product;
    use crate::pager::{PageRequest, PaginatedReader};

    fn write_derivative(dir: &Path, file_name: &str, count: usize) {
        let lines: Vec<String> = (1..=count)
            .map(|i| format!("{},Item {:03},{}.00", i, i, i))
            .collect();
        let mut content = lines.join("\n");
        if count > 0 {
            content.push('\n');
        }
        fs::write(dir.join(file_name), content).unwrap();
    }

    fn ids(records: &[Product]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn test_first_page() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 25);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 1, 10).await.unwrap();
        assert_eq!(ids(&page.records), (1..=10).collect::<Vec<_>>());
        assert_eq!(page.meta.total_count, 25);
        assert_eq!(page.meta.page_number, 1);
        assert_eq!(page.meta.page_size, 10);
        assert_eq!(page.meta.total_pages, 3);
    }

    #[tokio::test]
    async fn test_last_partial_page() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 25);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 3, 10).await.unwrap();
        assert_eq!(ids(&page.records), (21..=25).collect::<Vec<_>>());
        assert_eq!(page.meta.total_count, 25);
    }

    #[tokio::test]
    async fn test_pages_cover_file_exactly_once() {
        let temp_dir = tempdir().unwrap();
        let total = 23;
        write_derivative(temp_dir.path(), PRODUCTS_BY_NAME_FILE, total);
        let reader = PaginatedReader::new(temp_dir.path());

        for page_size in [1, 2, 5, 7, 23, 50] {
            let mut seen = Vec::new();
            let mut page_number = 1;
            loop {
                match reader.get_page("name", page_number, page_size).await {
                    Ok(page) => {
                        assert_eq!(page.meta.total_count, total);
                        seen.extend(ids(&page.records));
                        page_number += 1;
                    }
                    Err(CatalogError::PageOutOfRange { .. }) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            assert_eq!(seen, (1..=total as i64).collect::<Vec<_>>(), "page size {}", page_size);
            assert_eq!(page_number - 1, total.div_ceil(page_size as usize) as i64);
        }
    }

    #[tokio::test]
    async fn test_page_size_clamped_to_max() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 150);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 1, 500).await.unwrap();
        assert_eq!(page.records.len(), MAX_PAGE_SIZE);
        assert_eq!(page.meta.page_size, MAX_PAGE_SIZE);
        assert_eq!(page.meta.total_pages, 2);
    }

    #[tokio::test]
    async fn test_beyond_data_is_not_found() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 3);
        let reader = PaginatedReader::new(temp_dir.path());

        let err = reader.get_page("id", 5, 10).await.unwrap_err();
        assert!(matches!(err, CatalogError::PageOutOfRange { page_number: 5 }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_empty_file_first_page_is_empty() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 0);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 1, 10).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.meta.total_count, 0);
        assert_eq!(page.meta.total_pages, 0);

        assert!(matches!(
            reader.get_page("id", 2, 10).await,
            Err(CatalogError::PageOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp_dir = tempdir().unwrap();
        let reader = PaginatedReader::new(temp_dir.path());

        let err = reader.get_page("price", 1, 10).await.unwrap_err();
        assert!(matches!(err, CatalogError::DerivativeMissing { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_unknown_key_falls_back_to_id() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 4);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("popularity", 1, 2).await.unwrap();
        assert_eq!(ids(&page.records), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 4);
        let reader = PaginatedReader::new(temp_dir.path());

        for (page_number, page_size) in [(0, 10), (1, 0), (-1, 5), (1, -5)] {
            let err = reader.get_page("id", page_number, page_size).await.unwrap_err();
            assert!(matches!(err, CatalogError::InvalidArgument { .. }));
            assert_eq!(err.status_code(), 400);
        }
    }

    #[tokio::test]
    async fn test_garbage_lines_do_not_take_positions() {
        let temp_dir = tempdir().unwrap();
        let content = "1,A,1.00\n\n2,B\ngarbage\n3,C,3.00\n4,D,oops\n5,E,5.00\n6,F,6.00";
        fs::write(temp_dir.path().join(PRODUCTS_BY_ID_FILE), content).unwrap();
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 2, 2).await.unwrap();
        assert_eq!(ids(&page.records), vec![5, 6]);
        assert_eq!(page.meta.total_count, 4);
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 10);
        let reader = PaginatedReader::new(temp_dir.path())
            .with_shutdown_signal(Arc::new(AtomicBool::new(true)));

        let err = reader.fetch(&PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
    }

    #[tokio::test]
    async fn test_page_serializes_camel_case() {
        let temp_dir = tempdir().unwrap();
        write_derivative(temp_dir.path(), PRODUCTS_BY_ID_FILE, 3);
        let reader = PaginatedReader::new(temp_dir.path());

        let page = reader.get_page("id", 1, 2).await.unwrap();
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalCount"], 3);
        assert_eq!(json["pageNumber"], 1);
        assert_eq!(json["pageSize"], 2);
        assert_eq!(json["totalPages"], 2);
        assert_eq!(json["records"][1]["price"], "2.00");
    }
}
