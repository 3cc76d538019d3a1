// tests/loader_tests.rs - Delimiter/encoding detection against real files
use provider_audit::input_format::DELIMITERS;
use provider_audit::{load_path, load_source, AuditError, InputSource, TextEncoding};
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: [&str; 3] = ["Nome", "Data do último login", "Recebimento de O.S"];
const ROWS: [[&str; 3]; 3] = [
    ["João Silva", "01/01/2020 10:00:00", "ativo"],
    ["Conceição Araújo", "15/03/2024 08:15:00", "inativo"],
    ["Zé", "", "ativo"],
];

fn render(delimiter: u8) -> String {
    let sep = (delimiter as char).to_string();
    let mut text = HEADER.join(&sep);
    text.push('\n');
    for row in ROWS {
        text.push_str(&row.join(&sep));
        text.push('\n');
    }
    text
}

fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => {
            let mut bytes = b"\xEF\xBB\xBF".to_vec();
            bytes.extend_from_slice(text.as_bytes());
            bytes
        }
        TextEncoding::Utf16 => {
            let mut bytes = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            bytes
        }
        TextEncoding::Windows1252 => {
            let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
            assert!(!had_errors);
            encoded.into_owned()
        }
    }
}

#[test]
fn test_every_delimiter_encoding_pair_round_trips_header_and_rows() {
    println!("=== Testing loader across all delimiter/encoding pairs ===");

    for delimiter in DELIMITERS {
        for encoding in TextEncoding::PRIORITY {
            let bytes = encode(&render(delimiter), encoding);
            let source = InputSource::new("cpf.csv", bytes);

            let dataset = load_source(&source).unwrap_or_else(|e| {
                panic!(
                    "delimiter {:?} / {} failed: {}",
                    delimiter as char,
                    encoding.label(),
                    e
                )
            });

            assert_eq!(dataset.column_names(), HEADER.to_vec());
            assert_eq!(dataset.len(), ROWS.len());
            let names: Vec<String> = dataset
                .records()
                .map(|r| r.get("Nome").unwrap().render())
                .collect();
            assert_eq!(names, vec!["João Silva", "Conceição Araújo", "Zé"]);
            println!("✓ {:?} / {}", delimiter as char, encoding.label());
        }
    }
}

#[test]
fn test_single_column_fails_for_every_encoding() {
    for encoding in TextEncoding::PRIORITY {
        let bytes = encode("Nome\nJoão\nMaria\n", encoding);
        let source = InputSource::new("nomes.txt", bytes);
        match load_source(&source) {
            Err(AuditError::UnreadableFormat { source_name, attempts }) => {
                assert_eq!(source_name, "nomes.txt");
                assert_eq!(attempts.len(), 9);
            }
            other => panic!("{}: expected UnreadableFormat, got {:?}", encoding.label(), other),
        }
    }
}

#[test]
fn test_load_path_names_the_file_on_failure() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "apenas uma coluna").unwrap();
    file.flush().unwrap();

    let err = load_path(file.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&file.path().display().to_string()));
    assert!(message.contains("only 1 column(s)"));
}

#[test]
fn test_load_path_reads_legacy_semicolon_export() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let (bytes, _, _) = encoding_rs::WINDOWS_1252
        .encode("NOME_INSTALADOR;Status Pedido;Categoria\nJoão;Aberta;Serviço loja\n");
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let dataset = load_path(file.path()).unwrap();
    assert_eq!(
        dataset.column_names(),
        vec!["NOME_INSTALADOR", "Status Pedido", "Categoria"]
    );
    let record = dataset.records().next().unwrap();
    assert_eq!(record.get("Categoria").unwrap().render(), "Serviço loja");
}

#[test]
fn test_quoted_fields_keep_embedded_delimiters() {
    let source = InputSource::new(
        "mensal.csv",
        b"NOME_INSTALADOR,Observacao\n\"Silva, Jo\xC3\xA3o\",\"a;b\"\n".to_vec(),
    );
    let dataset = load_source(&source).unwrap();
    let record = dataset.records().next().unwrap();
    assert_eq!(record.get("NOME_INSTALADOR").unwrap().render(), "Silva, João");
    assert_eq!(record.get("Observacao").unwrap().render(), "a;b");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_path(std::path::Path::new("/nonexistent/cpf.csv")).unwrap_err();
    assert!(matches!(err, AuditError::Io(_)));
}
