// Shared fixtures: in-memory archives and provider payloads
#![allow(dead_code)]

use std::io::{Cursor, Write};

use hydromet_extractor::config::Config;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const GAUGE_UUID: &str = "593647aa-9fea-43ec-a7d6-6476a76ae868";

pub const MOSMIX_CATALOG: &str = "\
ID    ICAO NAME                 LAT    LON     ELEV
----- ---- -------------------- ------ ------- -----
01001 ENJA JAN MAYEN             70.56   -8.40    10
10015 EDXH HELGOLAND             54.11    7.54     4

P0489 ---- MÜNSTER/OSNABRÜCK     52.08    7.42    48
";

pub const CLIMATE_STATIONS: &str = "\
Stations_id von_datum bis_datum Stationshoehe geoBreite geoLaenge Stationsname Bundesland Abgabe
----------- --------- --------- ------------- --------- --------- ----------------------------------------- ---------- ------
00044 20070209 20240101             44     52.9336    8.2370 Großenkneten                             Niedersachsen                            Frei
00073 20070215 20240101            374     48.6183   13.0620 Aldersbach-Kramersepp                    Bayern
01048 20070101 20240101            228     51.1278   13.7543 Dresden-Klotzsche                        Sachsen                                  Frei
03987 20070101 20240101             81     52.3813   13.0622 Potsdam                                  Brandenburg                              Frei
";

pub const PRECIPITATION_CSV: &str = "\
STATIONS_ID;MESS_DATUM;  QN;RWS_DAU_10;RWS_10;RWS_IND_10;eor
         44;202401010000;    3;   0;   0.00;   0;eor
         44;202401010010;    3;  10;   0.12;   1;eor
         44;202401010020;    3;-999; -999;-999;eor
";

pub const TEMPERATURE_CSV: &str = "\
STATIONS_ID;MESS_DATUM;  QN;PP_10;TT_10;TM5_10;RF_10;TD_10;eor
       1048;202401010000;    3; 993.1;   2.1;   1.3;  93.0;   1.1;eor
       1048;202401010010;    3; 993.0;   2.0;  -999;  93.4;   1.0;eor
";

pub const PEGELONLINE_STATIONS: &str = r#"[
  {"uuid": "593647aa-9fea-43ec-a7d6-6476a76ae868", "number": "2730010", "shortname": "BONN",
   "longname": "BONN", "km": 654.8, "agency": "RHEIN", "longitude": 7.10, "latitude": 50.73,
   "water": {"shortname": "RHEIN", "longname": "RHEIN"}},
  {"uuid": "a6ee8177-107b-47dd-bcfd-30960ccc6e9c", "number": "2710080", "shortname": "KÖLN",
   "longname": "KÖLN", "km": 688.0, "agency": "RHEIN", "longitude": 6.96, "latitude": 50.94,
   "water": {"shortname": "RHEIN", "longname": "RHEIN"}}
]"#;

pub const CURRENT_MEASUREMENT: &str = r#"{"timestamp": "2024-01-01T10:00:00+01:00", "value": 312,
  "stateMnwMhw": "normal", "stateNswHsw": "unknown"}"#;

pub const WV_MEASUREMENTS: &str = r#"[
  {"initialized": "2024-01-01T06:00:00+01:00", "timestamp": "2024-01-01T12:00:00+01:00", "value": 310, "type": "forecast"},
  {"initialized": "2024-01-01T06:00:00+01:00", "timestamp": "2024-01-03T12:00:00+01:00", "value": 295, "type": "estimate"}
]"#;

/// Encode text as ISO-8859-1, the encoding of every DWD text product
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).expect("character outside ISO-8859-1"))
        .collect()
}

pub fn zip_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in members {
        writer.start_file(*name, options).expect("start zip member");
        writer.write_all(content).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// DWD 10-minute "now" archive: metadata member first, product file second
pub fn climate_zip(product_name: &str, csv: &str) -> Vec<u8> {
    zip_archive(&[
        ("Metadaten_Geographie.html", b"<html></html>".as_slice()),
        (product_name, latin1(csv).as_slice()),
    ])
}

pub fn mosmix_kml(station: &str, issue_time: &str, steps: &[&str], forecasts: &[(&str, &str)]) -> String {
    let steps: String = steps
        .iter()
        .map(|s| format!("<dwd:TimeStep>{s}</dwd:TimeStep>"))
        .collect();
    let forecasts: String = forecasts
        .iter()
        .map(|(name, values)| {
            format!(r#"<dwd:Forecast dwd:elementName="{name}"><dwd:value>{values}</dwd:value></dwd:Forecast>"#)
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1" standalone="no"?>
<kml:kml xmlns:dwd="https://opendata.dwd.de/weather/lib/pointforecast_dwd_extension_V1_0.xsd" xmlns:gx="http://www.google.com/kml/ext/2.2" xmlns:kml="http://www.opengis.net/kml/2.2" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:xal="urn:oasis:names:tc:ciq:xsdschema:xAL:2.0">
    <kml:Document>
        <kml:ExtendedData>
            <dwd:ProductDefinition>
                <dwd:Issuer>Deutscher Wetterdienst</dwd:Issuer>
                <dwd:ProductID>MOSMIX</dwd:ProductID>
                <dwd:GeneratingProcess>DWD MOSMIX hourly, Version 1.0</dwd:GeneratingProcess>
                <dwd:IssueTime>{issue_time}</dwd:IssueTime>
                <dwd:ReferencedModel>
                    <dwd:Model dwd:name="ICON" dwd:referenceTime="2024-01-01T00:00:00Z"/>
                </dwd:ReferencedModel>
                <dwd:ForecastTimeSteps>{steps}</dwd:ForecastTimeSteps>
                <dwd:FormatCfg>
                    <dwd:DefaultUndefSign>-</dwd:DefaultUndefSign>
                </dwd:FormatCfg>
            </dwd:ProductDefinition>
        </kml:ExtendedData>
        <kml:Placemark>
            <kml:name>{station}</kml:name>
            <kml:description>HELGOLAND</kml:description>
            <kml:ExtendedData>{forecasts}</kml:ExtendedData>
            <kml:Point>
                <kml:coordinates>7.9,54.18,4.0</kml:coordinates>
            </kml:Point>
        </kml:Placemark>
    </kml:Document>
</kml:kml>"#
    )
}

pub fn kmz(kml: &str) -> Vec<u8> {
    zip_archive(&[("MOSMIX_L_2024010103_10015.kml", latin1(kml).as_slice())])
}

/// Config with every provider pointed at the given mock server
pub fn test_config(server_url: &str) -> Config {
    let base = format!("{server_url}/");
    Config {
        dwd_opendata_url: base.clone(),
        dwd_url: base.clone(),
        pegelonline_url: base,
        request_timeout_secs: 5,
    }
}
