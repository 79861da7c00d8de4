//! Workbook loading and the upload store over in-memory XLSX files

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::thread;

use carburant::prelude::*;
use carburant::{UploadStoreOptions, VehicleType};
use pretty_assertions::assert_eq;

const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const HEADER: &str = r#"<row r="1"><c r="A1" t="str"><v>Mois</v></c><c r="B1" t="str"><v>Matricule</v></c><c r="C1" t="str"><v>Consommation (L)</v></c><c r="D1" t="str"><v>Kilométrage</v></c><c r="E1" t="str"><v>Produits transportés (T)</v></c></row>"#;

/// January merged over two trucks; the second truck's liters are a formula
/// saved without a cached result
fn trucks_sheet() -> String {
    format!(
        r#"<sheetData>{}
<row r="2"><c r="A2" t="str"><v>janvier</v></c><c r="B2" t="str"><v>1682 TU 147</v></c><c r="C2"><v>500</v></c><c r="D2"><v>4000</v></c><c r="E2"><v>30</v></c></row>
<row r="3"><c r="B3" t="str"><v>003 TU 187</v></c><c r="C3"><f>D3*0.12</f></c><c r="D3"><v>2500</v></c><c r="E3"><v>12</v></c></row>
<row r="4"><c r="A4" t="str"><v>février</v></c><c r="B4" t="str"><v>1682 TU 147</v></c><c r="C4"><f>SUM(C2:C2)-50</f><v>450</v></c><c r="D4"><v>3600</v></c><c r="E4"><v>28</v></c></row>
</sheetData><mergeCells count="1"><mergeCell ref="A2:A3"/></mergeCells>"#,
        HEADER
    )
}

fn minibus_sheet() -> String {
    format!(
        r#"<sheetData>{}
<row r="2"><c r="A2" t="str"><v>mars</v></c><c r="B2" t="str"><v>105774 RS</v></c><c r="C2"><v>120.5</v></c><c r="D2"><v>1500</v></c></row>
</sheetData>"#,
        HEADER
    )
}

fn build_xlsx(sheets: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(ROOT_RELS.as_bytes()).unwrap();

        let mut workbook = String::from(
            r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        let mut rels = String::from(
            r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (name, _)) in sheets.iter().enumerate() {
            workbook.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                name,
                i + 1,
                i + 1
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }
        workbook.push_str("</sheets></workbook>");
        rels.push_str("</Relationships>");

        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(workbook.as_bytes()).unwrap();
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();

        for (i, (_, body)) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</worksheet>"#,
                    body
                )
                .as_bytes(),
            )
            .unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn fleet_workbook() -> Vec<u8> {
    build_xlsx(&[("Camions", trucks_sheet()), ("Minibus", minibus_sheet())])
}

#[test]
fn test_sheet_names() {
    assert_eq!(sheet_names(&fleet_workbook()).unwrap(), ["Camions", "Minibus"]);
}

#[test]
fn test_extract_trucks() {
    let workbook = Workbook::from_bytes(fleet_workbook()).unwrap();
    assert_eq!(workbook.format(), carburant::SpreadsheetFormat::Xlsx);

    let extraction = workbook
        .extract_sheet("Camions", &ExtractOptions::default())
        .unwrap();
    let rows: Vec<(&str, &str, f64)> = extraction
        .records
        .iter()
        .map(|r| (r.matricule.as_str(), r.mois.as_str(), r.consommation_l))
        .collect();
    assert_eq!(
        rows,
        [
            ("1682 TU 147", "janvier", 500.0),
            ("003 TU 187", "janvier", 300.0),
            ("1682 TU 147", "février", 450.0),
        ]
    );
    assert!(extraction
        .records
        .iter()
        .all(|r| r.vehicle_type == VehicleType::Camion));

    let january = extraction.monthly_totals.get("janvier").unwrap();
    assert_eq!(january.consommation_l, 800.0);
    assert_eq!(january.kilometrage, 6500.0);

    let summary = monthly_summary(&extraction.records);
    let months: Vec<&str> = summary.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, ["janvier", "février"]);
}

#[test]
fn test_missing_sheet() {
    let err = extract_sheet(&fleet_workbook(), "Chariots", &ExtractOptions::default())
        .unwrap_err();
    assert!(err.is_sheet_not_found());
}

#[test]
fn test_open_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flotte.bin");
    std::fs::write(&path, fleet_workbook()).unwrap();

    let workbook = Workbook::open(&path).unwrap();
    let extraction = workbook
        .extract_sheet("Minibus", &ExtractOptions::default())
        .unwrap();
    assert_eq!(extraction.records.len(), 1);
    assert_eq!(extraction.records[0].vehicle_type, VehicleType::Minibus);
    assert_eq!(extraction.records[0].produits_tonnes, 0.0);
}

#[test]
fn test_upload_store_lifecycle() {
    let store = UploadStore::default();
    let token = store.put("flotte.xlsx", fleet_workbook()).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.name(token).unwrap(), "flotte.xlsx");
    assert_eq!(store.sheets(token).unwrap(), ["Camions", "Minibus"]);

    let extraction = store
        .extract(token, "Minibus", &ExtractOptions::default())
        .unwrap();
    assert_eq!(extraction.records[0].matricule, "105774 RS");

    assert!(store.remove(token));
    assert!(matches!(
        store.sheets(token),
        Err(Error::UnknownUpload(t)) if t == token
    ));
}

#[test]
fn test_upload_store_evicts_oldest() {
    let store = UploadStore::new(UploadStoreOptions { max_entries: 2 });
    let first = store.put("a.xlsx", fleet_workbook()).unwrap();
    let second = store.put("b.xlsx", fleet_workbook()).unwrap();
    let third = store.put("c.xlsx", fleet_workbook()).unwrap();

    assert_eq!(store.len(), 2);
    assert!(store.sheets(first).is_err());
    assert!(store.sheets(second).is_ok());
    assert!(store.sheets(third).is_ok());
}

#[test]
fn test_concurrent_uploads_stay_separate() {
    let store = Arc::new(UploadStore::default());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let bytes = if i % 2 == 0 {
                    build_xlsx(&[("Camions", trucks_sheet())])
                } else {
                    build_xlsx(&[("Minibus", minibus_sheet())])
                };
                let token = store.put(format!("upload-{}.xlsx", i), bytes).unwrap();
                (i, store.sheets(token).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (i, sheets) = handle.join().unwrap();
        let expected = if i % 2 == 0 { "Camions" } else { "Minibus" };
        assert_eq!(sheets, [expected]);
    }
    assert_eq!(store.len(), 4);
}
