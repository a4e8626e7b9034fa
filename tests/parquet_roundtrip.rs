#[cfg(test)]
mod parquet_container_integration_tests {
    use std::io::Cursor;

    use lightstream_parquet::enums::StreamCapabilities;
    use lightstream_parquet::models::streams::restricted::Restricted;
    use lightstream_parquet::models::types::parquet::Encoding;
    use lightstream_parquet::{
        Column, Compression, DataField, DataPageVersion, DataType, Field, ListField, MapField,
        ParquetError, ParquetFile, ParquetOptions, Schema, write_single_row_group,
    };

    fn id_name_schema() -> Schema {
        Schema::new(vec![
            DataField::new("id", DataType::Int32),
            DataField::new("name", DataType::String),
        ])
    }

    fn id_name_columns(schema: &Schema, ids: Vec<i32>, names: Vec<&str>) -> Vec<Column> {
        vec![
            Column::new(schema.data_field("id").unwrap(), ids),
            Column::new(schema.data_field("name").unwrap(), names),
        ]
    }

    async fn write_bytes(schema: Schema, columns: &[Column], options: ParquetOptions) -> Vec<u8> {
        write_single_row_group(Cursor::new(Vec::new()), schema, columns, options)
            .await
            .expect("writer must not fail")
            .into_inner()
    }

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    async fn open_bytes(bytes: Vec<u8>, options: ParquetOptions) -> ParquetFile<Cursor<Vec<u8>>> {
        ParquetFile::open(Cursor::new(bytes), options)
            .await
            .expect("reader must not fail")
    }

    #[tokio::test]
    async fn write_and_read_id_name() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![1, 2, 3], vec!["one", "two", "three"]);
        let bytes = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;
        assert_eq!(&bytes[..4], b"PAR1");
        assert_eq!(&bytes[bytes.len() - 4..], b"PAR1");

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.num_rows(), 3);
        assert_eq!(file.schema().data_fields(), schema.data_fields());
        let rg = &file.row_groups()[0];
        assert_eq!(rg.row_count(), 3);
        let ids = rg.read(&schema.data_field("id").unwrap()).await.unwrap();
        assert_eq!(ids.values().as_i32().unwrap(), &[1, 2, 3]);
        let names = rg.read(&schema.data_field("name").unwrap()).await.unwrap();
        assert_eq!(names.values().as_utf8().unwrap(), &["one", "two", "three"]);
    }

    #[tokio::test]
    async fn three_row_groups_sum_rows() {
        let schema = id_name_schema();
        let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema.clone(), ParquetOptions::default())
            .await
            .unwrap();
        file.write_row_group(&id_name_columns(&schema, vec![1], vec!["a"])).await.unwrap();
        file.write_row_group(&id_name_columns(&schema, vec![2, 3], vec!["b", "c"])).await.unwrap();
        file.write_row_group(&id_name_columns(&schema, vec![4, 5, 6], vec!["d", "e", "f"]))
            .await
            .unwrap();
        assert_eq!(file.num_rows(), 6);
        let bytes = file.into_inner().await.unwrap().into_inner();

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        let counts: Vec<usize> = file.row_groups().iter().map(|rg| rg.row_count()).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert_eq!(file.num_rows(), 6);
        let all = file.read_all_row_groups().await.unwrap();
        assert_eq!(all[2][0].values().as_i32().unwrap(), &[4, 5, 6]);
        assert_eq!(all[1][1].values().as_utf8().unwrap(), &["b", "c"]);
    }

    #[tokio::test]
    async fn nulls_keep_their_positions() {
        let schema = Schema::new(vec![
            DataField::optional("n", DataType::Int64),
            DataField::optional("s", DataType::String),
        ]);
        let columns = vec![
            Column::from_options(schema.data_field("n").unwrap(), vec![Some(5i64), None, None, Some(-1)]),
            Column::from_options(
                schema.data_field("s").unwrap(),
                vec![None, Some("x".to_string()), None, Some("y".to_string())],
            ),
        ];
        let bytes = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        let read = file.row_groups()[0].read_all().await.unwrap();
        assert_eq!(read[0].i64_options().unwrap(), vec![Some(5), None, None, Some(-1)]);
        assert_eq!(read[1].utf8_options().unwrap(), vec![None, Some("x"), None, Some("y")]);
        assert_eq!(read[0].null_count(), 2);
    }

    #[tokio::test]
    async fn all_null_columns_roundtrip() {
        let schema = Schema::new(vec![
            DataField::optional("i", DataType::Int32),
            DataField::optional("d", DataType::Double),
            DataField::optional("s", DataType::String),
            DataField::optional("b", DataType::Boolean),
        ]);
        let columns = vec![
            Column::from_options(schema.data_field("i").unwrap(), vec![None::<i32>; 5]),
            Column::from_options(schema.data_field("d").unwrap(), vec![None::<f64>; 5]),
            Column::from_options(schema.data_field("s").unwrap(), vec![None::<String>; 5]),
            Column::from_options(schema.data_field("b").unwrap(), vec![None::<bool>; 5]),
        ];
        let bytes = write_bytes(schema, &columns, ParquetOptions::default()).await;
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        for column in file.row_groups()[0].read_all().await.unwrap() {
            assert_eq!(column.len(), 5, "{}", column.field().name);
            assert_eq!(column.null_count(), 5, "{}", column.field().name);
        }
    }

    #[tokio::test]
    async fn out_of_order_write_is_rejected_without_writing() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![1, 2], vec!["a", "b"]);

        let clean = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;

        let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema.clone(), ParquetOptions::default())
            .await
            .unwrap();
        {
            let mut rg = file.new_row_group().unwrap();
            let err = rg.write(&columns[1]).await.unwrap_err();
            match err {
                ParquetError::SchemaOrder { expected, actual } => {
                    assert_eq!(expected, "id");
                    assert_eq!(actual, "name");
                }
                other => panic!("expected SchemaOrder, got {other:?}"),
            }
            rg.write(&columns[0]).await.unwrap();
            rg.write(&columns[1]).await.unwrap();
            rg.commit().unwrap();
        }
        let bytes = file.into_inner().await.unwrap().into_inner();
        assert_eq!(bytes, clean);
    }

    #[tokio::test]
    async fn commit_requires_every_column() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![1], vec!["a"]);
        let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema, ParquetOptions::default())
            .await
            .unwrap();
        let mut rg = file.new_row_group().unwrap();
        rg.write(&columns[0]).await.unwrap();
        assert!(matches!(rg.commit(), Err(ParquetError::SchemaOrder { .. })));
        assert!(file.row_groups().is_empty());
    }

    #[tokio::test]
    async fn mismatched_row_counts_are_rejected() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![1, 2], vec!["a"]);
        let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema, ParquetOptions::default())
            .await
            .unwrap();
        let mut rg = file.new_row_group().unwrap();
        rg.write(&columns[0]).await.unwrap();
        assert!(matches!(rg.write(&columns[1]).await, Err(ParquetError::InvalidColumn(_))));
    }

    #[tokio::test]
    async fn append_preserves_existing_row_groups() {
        init_logging();
        let schema = id_name_schema();
        let bytes = write_bytes(
            schema.clone(),
            &id_name_columns(&schema, vec![1, 2], vec!["a", "b"]),
            ParquetOptions::default(),
        )
        .await;

        let mut file = ParquetFile::create(Cursor::new(bytes), schema.clone(), ParquetOptions::default())
            .await
            .unwrap();
        assert_eq!(file.num_rows(), 2);
        file.write_row_group(&id_name_columns(&schema, vec![3, 4, 5], vec!["c", "d", "e"]))
            .await
            .unwrap();
        let bytes = file.into_inner().await.unwrap().into_inner();

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.num_rows(), 5);
        let all = file.read_all_row_groups().await.unwrap();
        assert_eq!(all[0][0].values().as_i32().unwrap(), &[1, 2]);
        assert_eq!(all[0][1].values().as_utf8().unwrap(), &["a", "b"]);
        assert_eq!(all[1][0].values().as_i32().unwrap(), &[3, 4, 5]);
    }

    #[tokio::test]
    async fn append_with_other_schema_is_rejected() {
        init_logging();
        let schema = id_name_schema();
        let bytes = write_bytes(
            schema.clone(),
            &id_name_columns(&schema, vec![1], vec!["a"]),
            ParquetOptions::default(),
        )
        .await;
        let other = Schema::new(vec![DataField::new("id", DataType::Int64)]);
        let err = ParquetFile::create(Cursor::new(bytes), other, ParquetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetError::SchemaMismatch(_)));
    }

    #[tokio::test]
    async fn custom_metadata_last_write_wins() {
        let schema = id_name_schema();
        let mut file = ParquetFile::create(Cursor::new(Vec::new()), schema.clone(), ParquetOptions::default())
            .await
            .unwrap();
        file.metadata_mut().set("owner", "first");
        file.metadata_mut().set("purpose", "tests");
        file.metadata_mut().set("owner", "second");
        file.write_row_group(&id_name_columns(&schema, vec![1], vec!["a"])).await.unwrap();
        let bytes = file.into_inner().await.unwrap().into_inner();

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        let pairs: Vec<(&str, &str)> = file.metadata().iter().collect();
        assert_eq!(pairs, vec![("purpose", "tests"), ("owner", "second")]);
        assert_eq!(file.metadata().get("owner"), Some("second"));
    }

    #[tokio::test]
    async fn bad_framing_is_rejected_and_stream_untouched() {
        for sample in [&b"PAR2dataPAR1"[..], &b"PAR1dataPAR2"[..], &b"PAR1PAR1"[..], &b""[..]] {
            let mut cursor = Cursor::new(sample.to_vec());
            let err = ParquetFile::open(&mut cursor, ParquetOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, ParquetError::Format(_)), "{sample:?}: {err:?}");
            assert_eq!(cursor.get_ref().as_slice(), sample);
        }
    }

    #[tokio::test]
    async fn bogus_footer_length_is_rejected() {
        let mut bytes = b"PAR1".to_vec();
        bytes.extend_from_slice(&1000i32.to_le_bytes());
        bytes.extend_from_slice(b"PAR1");
        let err = ParquetFile::open(Cursor::new(bytes), ParquetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetError::Format(_)));
    }

    #[tokio::test]
    async fn capabilities_are_checked() {
        let write_only = Restricted::write_only(Cursor::new(b"PAR1whateverPAR1".to_vec()));
        let err = ParquetFile::open(write_only, ParquetOptions::default()).await.unwrap_err();
        assert!(matches!(err, ParquetError::Capability(_)));

        let read_only = Restricted::read_only(Cursor::new(Vec::new()));
        let err = ParquetFile::create(read_only, id_name_schema(), ParquetOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetError::Capability(_)));
    }

    #[tokio::test]
    async fn forward_only_stream_can_be_written() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![7, 8, 9], vec!["x", "y", "z"]);
        let mut file = ParquetFile::create(
            Restricted::write_only(Cursor::new(Vec::new())),
            schema.clone(),
            ParquetOptions::default(),
        )
        .await
        .unwrap();
        assert!(!file.capabilities().seekable);
        file.write_row_group(&columns).await.unwrap();
        file.write_row_group(&columns).await.unwrap();

        let err = file.row_groups()[0].read(&schema.data_field("id").unwrap()).await.unwrap_err();
        assert!(matches!(err, ParquetError::Capability(_)));

        let bytes = file.into_inner().await.unwrap().into_inner().into_inner();
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.num_rows(), 6);
        let all = file.read_all_row_groups().await.unwrap();
        assert_eq!(all[1][1].values().as_utf8().unwrap(), &["x", "y", "z"]);
    }

    #[tokio::test]
    async fn missing_field_is_field_not_found() {
        let schema = id_name_schema();
        let bytes = write_bytes(
            schema.clone(),
            &id_name_columns(&schema, vec![1], vec!["a"]),
            ParquetOptions::default(),
        )
        .await;
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        let err = file.row_groups()[0]
            .read(&DataField::new("missing", DataType::Int32))
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetError::FieldNotFound(p) if p == "missing"));
    }

    #[tokio::test]
    async fn list_repetition_levels_roundtrip() {
        let schema = Schema::new(vec![ListField::new(
            "numbers",
            DataField::new("element", DataType::Int32),
        )]);
        let field = schema.data_field("numbers.list.element").unwrap();
        // [[1, 2, 3], [4], [5, 6, 7], [8]]
        let column = Column::new(field.clone(), vec![1i32, 2, 3, 4, 5, 6, 7, 8])
            .with_repetition_levels(vec![0, 1, 1, 0, 0, 1, 1, 0]);
        let bytes = write_bytes(schema, &[column], ParquetOptions::default()).await;

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.num_rows(), 4);
        let read = file.row_groups()[0].read(&field).await.unwrap();
        assert_eq!(read.repetition_levels(), Some(&[0, 1, 1, 0, 0, 1, 1, 0][..]));
        assert_eq!(read.values().as_i32().unwrap(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(read.row_count(), 4);
    }

    #[tokio::test]
    async fn map_roundtrip() {
        let schema = Schema::new(vec![MapField::new(
            "attrs",
            DataField::new("key", DataType::String),
            DataField::optional("value", DataType::Int32),
        )]);
        let keys = schema.data_field("attrs.key_value.key").unwrap();
        let values = schema.data_field("attrs.key_value.value").unwrap();
        // {a: 1, b: null}, {}, {c: 3}
        let columns = vec![
            Column::new(keys.clone(), vec!["a", "b", "", "c"])
                .with_definition_levels(vec![2, 2, 1, 2])
                .with_repetition_levels(vec![0, 1, 0, 0]),
            Column::from_options(values.clone(), vec![Some(1i32), None, None, Some(3)])
                .with_definition_levels(vec![3, 2, 1, 3])
                .with_repetition_levels(vec![0, 1, 0, 0]),
        ];
        let bytes = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert!(matches!(file.schema().fields()[0], Field::Map(_)));
        assert_eq!(file.num_rows(), 3);
        let read_values = file.row_groups()[0].read(&values).await.unwrap();
        assert_eq!(read_values.i32_options().unwrap(), vec![Some(1), None, None, Some(3)]);
        assert_eq!(read_values.definition_levels(), Some(&[3, 2, 1, 3][..]));
        let read_keys = file.row_groups()[0].read(&keys).await.unwrap();
        assert_eq!(read_keys.utf8_options().unwrap(), vec![Some("a"), Some("b"), None, Some("c")]);
    }

    #[tokio::test]
    async fn annotated_types_roundtrip() {
        let schema = Schema::new(vec![
            DataField::new("day", DataType::Date),
            DataField::new("at", DataType::TimestampMillis),
            DataField::new("price", DataType::Decimal { precision: 10, scale: 2 }),
            DataField::new("big", DataType::Decimal { precision: 30, scale: 4 }),
            DataField::new("blob", DataType::Binary),
            DataField::new("ratio", DataType::Float),
        ]);
        let columns = vec![
            Column::new(schema.data_field("day").unwrap(), vec![19_000i32, 19_001]),
            Column::new(schema.data_field("at").unwrap(), vec![1_700_000_000_000i64, 0]),
            Column::new(schema.data_field("price").unwrap(), vec![12_345i128, -99]),
            Column::new(
                schema.data_field("big").unwrap(),
                vec![123_456_789_012_345_678_901i128, -1],
            ),
            Column::new(schema.data_field("blob").unwrap(), vec![vec![0u8, 255, 7], vec![]]),
            Column::new(schema.data_field("ratio").unwrap(), vec![0.25f32, -8.5]),
        ];
        let bytes = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;

        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.schema().data_fields(), schema.data_fields());
        let read = file.row_groups()[0].read_all().await.unwrap();
        for (written, read) in columns.iter().zip(&read) {
            assert_eq!(written.values(), read.values(), "{}", written.field().name);
        }
    }

    #[tokio::test]
    async fn repetitive_strings_are_dictionary_encoded() {
        let schema = Schema::new(vec![DataField::new("city", DataType::String)]);
        let cities: Vec<&str> = ["Oslo", "Lima", "Oslo", "Pune", "Lima", "Oslo", "Oslo", "Pune"].to_vec();
        let field = schema.data_field("city").unwrap();
        let columns = vec![Column::new(field.clone(), cities.clone())];

        let bytes = write_bytes(schema.clone(), &columns, ParquetOptions::default()).await;
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        let meta = file.row_groups()[0].columns()[0].meta_data.clone().unwrap();
        assert!(meta.encodings.contains(&Encoding::RleDictionary));
        assert!(meta.dictionary_page_offset.is_some());
        let read = file.row_groups()[0].read(&field).await.unwrap();
        assert_eq!(read.values().as_utf8().unwrap(), cities.as_slice());

        let plain = ParquetOptions::default().with_dictionary(false);
        let bytes = write_bytes(schema, &columns, plain.clone()).await;
        let file = open_bytes(bytes, plain).await;
        let meta = file.row_groups()[0].columns()[0].meta_data.clone().unwrap();
        assert!(!meta.encodings.contains(&Encoding::RleDictionary));
    }

    #[tokio::test]
    async fn v2_pages_with_compression_roundtrip() {
        let schema = Schema::new(vec![
            Field::from(DataField::optional("v", DataType::Int32)),
            Field::from(ListField::new("tags", DataField::new("element", DataType::String))),
        ]);
        let v = schema.data_field("v").unwrap();
        let tags = schema.data_field("tags.list.element").unwrap();
        let n = 50;
        let values: Vec<Option<i32>> = (0..n).map(|i| (i % 3 != 0).then_some(i)).collect();
        let mut tag_values = Vec::new();
        let mut rep = Vec::new();
        for i in 0..n {
            tag_values.push(format!("t{}", i % 4));
            rep.push(0);
            tag_values.push(format!("u{}", i % 5));
            rep.push(1);
        }
        let columns = vec![
            Column::from_options(v.clone(), values.clone()),
            Column::new(tags.clone(), tag_values.clone()).with_repetition_levels(rep.clone()),
        ];
        let options = ParquetOptions::default()
            .with_data_page_version(DataPageVersion::V2)
            .with_compression(Compression::Snappy)
            .with_page_row_limit(16);
        let bytes = write_bytes(schema, &columns, options.clone()).await;

        let file = open_bytes(bytes, options).await;
        assert_eq!(file.num_rows(), n as i64);
        let read_v = file.row_groups()[0].read(&v).await.unwrap();
        assert_eq!(read_v.i32_options().unwrap(), values);
        let read_tags = file.row_groups()[0].read(&tags).await.unwrap();
        assert_eq!(read_tags.values().as_utf8().unwrap(), tag_values.as_slice());
        assert_eq!(read_tags.repetition_levels(), Some(rep.as_slice()));
    }

    #[tokio::test]
    async fn empty_row_group_roundtrip() {
        let schema = id_name_schema();
        let columns = id_name_columns(&schema, vec![], vec![]);
        let bytes = write_bytes(schema, &columns, ParquetOptions::default()).await;
        let file = open_bytes(bytes, ParquetOptions::default()).await;
        assert_eq!(file.num_rows(), 0);
        let read = file.row_groups()[0].read_all().await.unwrap();
        assert!(read.iter().all(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn file_on_disk_roundtrip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let schema = id_name_schema();
        {
            let mut file = ParquetFile::create_path(tmp.path(), schema.clone(), ParquetOptions::default())
                .await
                .unwrap();
            file.write_row_group(&id_name_columns(&schema, vec![1, 2], vec!["a", "b"]))
                .await
                .unwrap();
            file.finalize().await.unwrap();
        }
        {
            // non-empty file: append
            let mut file = ParquetFile::create_path(tmp.path(), schema.clone(), ParquetOptions::default())
                .await
                .unwrap();
            file.write_row_group(&id_name_columns(&schema, vec![3], vec!["c"])).await.unwrap();
            file.finalize().await.unwrap();
        }

        let file = ParquetFile::open_path(tmp.path(), ParquetOptions::default()).await.unwrap();
        assert_eq!(file.num_rows(), 3);
        assert_eq!(file.capabilities(), StreamCapabilities::READ_ONLY);
        let all = file.read_all_row_groups().await.unwrap();
        assert_eq!(all[1][1].values().as_utf8().unwrap(), &["c"]);
    }

    #[tokio::test]
    async fn open_path_is_read_only() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let schema = id_name_schema();
        let mut file = ParquetFile::create_path(tmp.path(), schema.clone(), ParquetOptions::default())
            .await
            .unwrap();
        file.write_row_group(&id_name_columns(&schema, vec![1], vec!["a"]))
            .await
            .unwrap();
        file.finalize().await.unwrap();
        drop(file);
        let before = std::fs::read(tmp.path()).unwrap();

        let mut file = ParquetFile::open_path(tmp.path(), ParquetOptions::default()).await.unwrap();
        let err = file.new_row_group().unwrap_err();
        assert!(matches!(err, ParquetError::Capability(_)), "{err:?}");
        let err = file
            .write_row_group(&id_name_columns(&schema, vec![2], vec!["b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ParquetError::Capability(_)), "{err:?}");
        assert!(!file.is_dirty());
        file.finalize().await.unwrap();
        drop(file);

        assert_eq!(std::fs::read(tmp.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn duplicate_leaf_paths_are_rejected() {
        let schema = Schema::new(vec![
            DataField::new("id", DataType::Int32),
            DataField::new("id", DataType::Int32),
        ]);
        let err = ParquetFile::create(Cursor::new(Vec::new()), schema, ParquetOptions::default())
            .await
            .unwrap_err();
        match err {
            ParquetError::DuplicateField(path) => assert_eq!(path, "id"),
            other => panic!("expected DuplicateField, got {other:?}"),
        }
    }
}
