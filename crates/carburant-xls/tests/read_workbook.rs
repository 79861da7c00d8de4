//! Reads BIFF8 workbooks assembled in memory

use std::io::{Cursor, Write};

use carburant_core::{CellRange, CellValue, DateSystem, RawCell};
use carburant_xls::biff::records;
use carburant_xls::{XlsError, XlsReader};
use pretty_assertions::assert_eq;

fn record(record_type: u16, body: &[u8]) -> Vec<u8> {
    let mut out = record_type.to_le_bytes().to_vec();
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn bof(version: u16, dt: u16) -> Vec<u8> {
    let mut body = version.to_le_bytes().to_vec();
    body.extend_from_slice(&dt.to_le_bytes());
    body.extend_from_slice(&[0; 12]);
    record(records::BOF, &body)
}

fn unicode(text: &str) -> Vec<u8> {
    let mut out = (text.len() as u16).to_le_bytes().to_vec();
    out.push(0);
    out.extend_from_slice(text.as_bytes());
    out
}

fn cell(row: u16, col: u16, xf: u16) -> Vec<u8> {
    [row.to_le_bytes(), col.to_le_bytes(), xf.to_le_bytes()].concat()
}

/// A worksheet (type 0) or chart (type 2) substream
struct Sheet {
    name: &'static str,
    sheet_type: u8,
    records: Vec<Vec<u8>>,
}

fn build_stream(version: u16, date_mode: u16, sst: &[&str], sheets: &[Sheet]) -> Vec<u8> {
    let mut globals = Vec::new();
    globals.extend(bof(version, records::BOF_WORKBOOK_GLOBALS));
    globals.extend(record(records::DATEMODE, &date_mode.to_le_bytes()));

    let mut format = 164u16.to_le_bytes().to_vec();
    format.extend(unicode("mmmm yyyy"));
    globals.extend(record(records::FORMAT, &format));
    for ifmt in [0u16, 164] {
        let mut xf = vec![0u8; 20];
        xf[2..4].copy_from_slice(&ifmt.to_le_bytes());
        globals.extend(record(records::XF, &xf));
    }

    let mut sst_body = (sst.len() as u32).to_le_bytes().to_vec();
    sst_body.extend_from_slice(&(sst.len() as u32).to_le_bytes());
    for s in sst {
        sst_body.extend(unicode(s));
    }
    globals.extend(record(records::SST, &sst_body));

    let mut patch_at = Vec::new();
    for sheet in sheets {
        patch_at.push(globals.len() + 4);
        let mut body = vec![0, 0, 0, 0, 0, sheet.sheet_type, sheet.name.len() as u8, 0];
        body.extend_from_slice(sheet.name.as_bytes());
        globals.extend(record(records::BOUNDSHEET, &body));
    }
    globals.extend(record(records::EOF, &[]));

    let mut stream = globals;
    for (sheet, patch) in sheets.iter().zip(patch_at) {
        let offset = stream.len() as u32;
        stream[patch..patch + 4].copy_from_slice(&offset.to_le_bytes());
        stream.extend(bof(version, records::BOF_WORKSHEET));
        for rec in &sheet.records {
            stream.extend_from_slice(rec);
        }
        stream.extend(record(records::EOF, &[]));
    }
    stream
}

fn into_cfb(stream: &[u8]) -> Vec<u8> {
    let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    {
        let mut workbook = comp.create_stream("/Workbook").unwrap();
        workbook.write_all(stream).unwrap();
    }
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

fn fleet_sheet() -> Sheet {
    let mut recs = Vec::new();

    // A1 "Mois", B1 "Matricule" via SST; C1 inline LABEL
    recs.push(record(records::LABELSST, &[cell(0, 0, 0), 0u32.to_le_bytes().to_vec()].concat()));
    recs.push(record(records::LABELSST, &[cell(0, 1, 0), 1u32.to_le_bytes().to_vec()].concat()));
    recs.push(record(records::LABEL, &[cell(0, 2, 0), unicode("Consommation")].concat()));

    // A2 date-formatted NUMBER, B2 SST, C2 RK 512.5
    recs.push(record(records::NUMBER, &[cell(1, 0, 1), 45292f64.to_le_bytes().to_vec()].concat()));
    recs.push(record(records::LABELSST, &[cell(1, 1, 0), 2u32.to_le_bytes().to_vec()].concat()));
    recs.push(record(records::RK, &[cell(1, 2, 0), ((51250u32 << 2) | 0x03).to_le_bytes().to_vec()].concat()));

    // Row 3: MULRK over B3:C3, then a formatted blank
    let mut mulrk = Vec::new();
    mulrk.extend_from_slice(&2u16.to_le_bytes());
    mulrk.extend_from_slice(&1u16.to_le_bytes());
    for value in [7u32, 300] {
        mulrk.extend_from_slice(&0u16.to_le_bytes());
        mulrk.extend_from_slice(&((value << 2) | 0x02).to_le_bytes());
    }
    mulrk.extend_from_slice(&2u16.to_le_bytes());
    recs.push(record(records::MULRK, &mulrk));
    recs.push(record(records::BLANK, &cell(2, 3, 0)));

    // D2 BOOLERR #DIV/0!, E2 BOOLERR TRUE
    recs.push(record(records::BOOLERR, &[cell(1, 3, 0), vec![0x07, 1]].concat()));
    recs.push(record(records::BOOLERR, &[cell(1, 4, 0), vec![1, 0]].concat()));

    // F2 numeric formula, G2 string formula + STRING
    let tail = [0u8; 6];
    recs.push(record(
        records::FORMULA,
        &[cell(1, 5, 0), 4100f64.to_le_bytes().to_vec(), tail.to_vec()].concat(),
    ));
    recs.push(record(
        records::FORMULA,
        &[cell(1, 6, 0), vec![0, 0, 0, 0, 0, 0, 0xFF, 0xFF], tail.to_vec()].concat(),
    ));
    recs.push(record(records::STRING, &unicode("Camion")));

    // A2:A3 merged
    let mut merge = 1u16.to_le_bytes().to_vec();
    for v in [1u16, 2, 0, 0] {
        merge.extend_from_slice(&v.to_le_bytes());
    }
    recs.push(record(records::MERGECELLS, &merge));

    Sheet {
        name: "Camions",
        sheet_type: 0,
        records: recs,
    }
}

fn chart_sheet() -> Sheet {
    Sheet {
        name: "Graphique",
        sheet_type: 2,
        records: Vec::new(),
    }
}

#[test]
fn test_read_fleet_sheet() {
    let stream = build_stream(
        records::BIFF8_VERSION,
        0,
        &["Mois", "Matricule", "123 TU 4567"],
        &[fleet_sheet()],
    );
    let sheets = XlsReader::read(Cursor::new(into_cfb(&stream))).unwrap();
    assert_eq!(sheets.len(), 1);

    let sheet = &sheets[0];
    assert_eq!(sheet.name(), "Camions");
    assert_eq!(sheet.value_at(0, 0), CellValue::text("Mois"));
    assert_eq!(sheet.value_at(0, 1), CellValue::text("Matricule"));
    assert_eq!(sheet.value_at(0, 2), CellValue::text("Consommation"));
    assert_eq!(sheet.value_at(1, 0).render(), "janvier 2024");
    assert_eq!(sheet.value_at(1, 1), CellValue::text("123 TU 4567"));
    assert_eq!(sheet.value_at(1, 2), CellValue::Number(512.5));
    assert_eq!(sheet.value_at(2, 1), CellValue::Number(7.0));
    assert_eq!(sheet.value_at(2, 2), CellValue::Number(300.0));
    assert!(sheet.get(2, 3).is_none());
    assert_eq!(sheet.get(1, 3), Some(&RawCell::error("#DIV/0!")));
    assert_eq!(sheet.value_at(1, 4), CellValue::Boolean(true));
    assert_eq!(sheet.value_at(1, 5), CellValue::Number(4100.0));
    assert_eq!(sheet.value_at(1, 6), CellValue::text("Camion"));
    assert_eq!(sheet.merged_regions(), &[CellRange::parse("A2:A3").unwrap()]);
}

#[test]
fn test_sheet_names_skip_charts() {
    let mut bus = fleet_sheet();
    bus.name = "Bus";
    let stream = build_stream(
        records::BIFF8_VERSION,
        0,
        &["Mois", "Matricule", "RS 12"],
        &[fleet_sheet(), chart_sheet(), bus],
    );
    let bytes = into_cfb(&stream);

    let names = XlsReader::sheet_names(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(names, vec!["Camions".to_string(), "Bus".to_string()]);

    let bus = XlsReader::read_sheet(Cursor::new(bytes.clone()), "Bus").unwrap();
    assert_eq!(bus.value_at(1, 1), CellValue::text("RS 12"));

    let err = XlsReader::read_sheet(Cursor::new(bytes), "Graphique").unwrap_err();
    assert!(matches!(err, XlsError::SheetNotFound(_)));
}

#[test]
fn test_1904_date_mode() {
    let sheet = Sheet {
        name: "Feuil1",
        sheet_type: 0,
        records: vec![record(
            records::NUMBER,
            &[cell(0, 0, 1), 0f64.to_le_bytes().to_vec()].concat(),
        )],
    };
    let stream = build_stream(records::BIFF8_VERSION, 1, &[], &[sheet]);
    let sheet = XlsReader::read_sheet(Cursor::new(into_cfb(&stream)), "Feuil1").unwrap();

    assert_eq!(sheet.date_system(), DateSystem::Date1904);
    assert_eq!(sheet.value_at(0, 0).render(), "janvier 1904");
}

#[test]
fn test_biff5_is_unsupported() {
    let stream = build_stream(0x0500, 0, &[], &[]);
    let err = XlsReader::read(Cursor::new(into_cfb(&stream))).unwrap_err();
    assert!(matches!(err, XlsError::UnsupportedVersion(_)));
}

#[test]
fn test_not_a_compound_file() {
    let err = XlsReader::read(Cursor::new(b"Mois;Matricule\n".to_vec())).unwrap_err();
    assert!(matches!(err, XlsError::Io(_)));
}
