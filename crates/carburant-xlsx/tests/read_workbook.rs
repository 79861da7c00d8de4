//! Reads small workbooks assembled in memory

use std::io::{Cursor, Write};

use carburant_core::{CellRange, CellValue, DateSystem, RawCell};
use carburant_xlsx::{XlsxError, XlsxReader};
use pretty_assertions::assert_eq;

const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="mmmm yyyy"/></numFmts><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4"><si><t>Mois</t></si><si><t>Matricule</t></si><si><r><t>Consommation </t></r><r><t>(L)</t></r></si><si><t>123 TU 4567</t></si></sst>"#;

/// Build an xlsx holding `sheets` as (name, sheetData xml), with optional
/// workbookPr attributes
fn build_xlsx(sheets: &[(&str, &str)], workbook_pr: &str) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(ROOT_RELS.as_bytes()).unwrap();

        let mut workbook = format!(
            r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr {}/><sheets>"#,
            workbook_pr
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
        zip.start_file("xl/styles.xml", options).unwrap();
        zip.write_all(STYLES.as_bytes()).unwrap();
        zip.start_file("xl/sharedStrings.xml", options).unwrap();
        zip.write_all(SHARED_STRINGS.as_bytes()).unwrap();

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

const FLEET_SHEET: &str = r#"<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="inlineStr"><is><t>Kilométrage</t></is></c></row>
<row r="2"><c r="A2" s="1"><v>45292</v></c><c r="B2" t="s"><v>3</v></c><c r="C2"><v>512.5</v></c><c r="D2"><f>C2*8</f><v>4100</v></c></row>
<row r="3"><c r="A3" s="1"/><c r="B3" t="str"><v>TU_x0020_77</v></c><c r="C3" t="e"><v>#DIV/0!</v></c><c r="D3"><f>SUM(D2:D2)</f></c><c r="E3" t="b"><v>1</v></c></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="A2:A3"/></mergeCells>"#;

#[test]
fn test_sheet_names_in_workbook_order() {
    let bytes = build_xlsx(
        &[("Camions", "<sheetData/>"), ("Bus", "<sheetData/>")],
        "",
    );
    let names = XlsxReader::sheet_names(Cursor::new(bytes)).unwrap();
    assert_eq!(names, vec!["Camions".to_string(), "Bus".to_string()]);
}

#[test]
fn test_read_fleet_sheet() {
    let bytes = build_xlsx(&[("Parc", FLEET_SHEET)], "");
    let sheets = XlsxReader::read(Cursor::new(bytes)).unwrap();
    assert_eq!(sheets.len(), 1);

    let sheet = &sheets[0];
    assert_eq!(sheet.name(), "Parc");
    assert_eq!(sheet.date_system(), DateSystem::Date1900);
    assert_eq!(sheet.value_at(0, 0), CellValue::text("Mois"));
    assert_eq!(sheet.value_at(0, 2), CellValue::text("Consommation (L)"));
    assert_eq!(sheet.value_at(0, 3), CellValue::text("Kilométrage"));
    assert_eq!(sheet.value_at(1, 1), CellValue::text("123 TU 4567"));
    assert_eq!(sheet.value_at(1, 2), CellValue::Number(512.5));
    assert_eq!(sheet.value_at(2, 1), CellValue::text("TU 77"));
    assert_eq!(sheet.value_at(2, 4), CellValue::Boolean(true));

    // date-formatted number
    let month = sheet.value_at(1, 0);
    assert!(month.is_date());
    assert_eq!(month.render(), "janvier 2024");

    // styled blank cell stores nothing
    assert!(sheet.get(2, 0).is_none());

    // cached and uncached formulas
    assert_eq!(
        sheet.get(1, 3),
        Some(&RawCell::Formula {
            source: "=C2*8".into(),
            cached: Some(CellValue::Number(4100.0)),
            date_formatted: false,
        })
    );
    assert_eq!(sheet.get(2, 3), Some(&RawCell::formula("=SUM(D2:D2)", None)));

    assert_eq!(sheet.get(2, 2), Some(&RawCell::error("#DIV/0!")));
    assert_eq!(
        sheet.merged_regions(),
        &[CellRange::parse("A2:A3").unwrap()]
    );
}

#[test]
fn test_read_single_sheet_by_name() {
    let bytes = build_xlsx(
        &[
            ("Camions", r#"<sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData>"#),
            ("Bus", r#"<sheetData><row r="4"><c r="B4"><v>2</v></c></row></sheetData>"#),
        ],
        "",
    );

    let bus = XlsxReader::read_sheet(Cursor::new(bytes.clone()), "Bus").unwrap();
    assert_eq!(bus.value_at(3, 1), CellValue::Number(2.0));
    assert_eq!(bus.dimensions(), (4, 2));

    let err = XlsxReader::read_sheet(Cursor::new(bytes), "Minibus").unwrap_err();
    assert!(matches!(err, XlsxError::SheetNotFound(name) if name == "Minibus"));
}

#[test]
fn test_cells_without_references() {
    let bytes = build_xlsx(
        &[(
            "Feuil1",
            r#"<sheetData><row><c><v>1</v></c><c><v>2</v></c></row><row><c><v>3</v></c></row></sheetData>"#,
        )],
        "",
    );
    let sheet = XlsxReader::read_sheet(Cursor::new(bytes), "Feuil1").unwrap();
    assert_eq!(sheet.value_at(0, 1), CellValue::Number(2.0));
    assert_eq!(sheet.value_at(1, 0), CellValue::Number(3.0));
}

#[test]
fn test_1904_date_system() {
    let bytes = build_xlsx(
        &[(
            "Feuil1",
            r#"<sheetData><row r="1"><c r="A1" s="1"><v>0</v></c></row></sheetData>"#,
        )],
        r#"date1904="1""#,
    );
    let sheet = XlsxReader::read_sheet(Cursor::new(bytes), "Feuil1").unwrap();
    assert_eq!(sheet.date_system(), DateSystem::Date1904);
    assert_eq!(sheet.value_at(0, 0).render(), "janvier 1904");
}

#[test]
fn test_read_file_from_disk() {
    let bytes = build_xlsx(&[("Parc", FLEET_SHEET)], "");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let sheets = XlsxReader::read_file(file.path()).unwrap();
    assert_eq!(sheets[0].value_at(0, 1), CellValue::text("Matricule"));
}
