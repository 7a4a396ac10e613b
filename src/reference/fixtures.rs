//! Small reference datasets shared by the unit tests.

use crate::config::ResolverConfig;
use std::fs;
use std::path::{Path, PathBuf};

fn feature(props: &str, ring: &str) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{{}}},"geometry":{{"type":"Polygon","coordinates":[{}]}}}}"#,
        props, ring
    )
}

fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> String {
    format!(
        "[[{a},{b}],[{c},{b}],[{c},{d}],[{a},{d}],[{a},{b}]]",
        a = min_lon,
        b = min_lat,
        c = max_lon,
        d = max_lat
    )
}

/// Feature count that carries a display name.
pub const COUNTRIES_WITH_NAME: usize = 10;

pub static COUNTRIES_GEOJSON: std::sync::LazyLock<String> = std::sync::LazyLock::new(|| {
    let features = [
        feature(r#""ADMIN":"United States of America","ISO_A2":"US""#, &rect(-125.0, 24.0, -66.0, 50.0)),
        feature(r#""ADMIN":"Japan","ISO_A2":"JP""#, &rect(129.0, 31.0, 146.0, 46.0)),
        feature(r#""ADMIN":"France","ISO_A2":"-99""#, &rect(-5.0, 42.0, 8.0, 51.0)),
        feature(r#""ADMIN":"Cyprus","ISO_A2":"CY""#, &rect(32.0, 34.5, 34.0, 35.0)),
        feature(r#""ADMIN":"Cyprus","ISO_A2":"CY""#, &rect(30.0, 30.0, 31.0, 31.0)),
        feature(r#""ADMIN":"Flatland","ISO_A2":"-99""#, "[[0,0],[0,0],[0,0]]"),
        feature(r#""ADMIN":null,"ISO_A2":"XX""#, &rect(0.0, 0.0, 1.0, 1.0)),
        feature(r#""ADMIN":"Somaliland","ISO_A2":"-99""#, &rect(43.0, 8.0, 48.0, 11.5)),
        feature(r#""ADMIN":"Republic of Serbia","ISO_A2":"RS""#, &rect(18.8, 42.2, 23.0, 46.2)),
        feature(r#""ADMIN":"Germany","ISO_A2":"DE""#, &rect(6.0, 47.0, 15.0, 55.0)),
        feature(r#""ADMIN":"Norge","ISO_A2":"NO""#, &rect(4.5, 58.0, 31.0, 71.0)),
    ];
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
});

pub static SUBDIVISIONS_GEOJSON: std::sync::LazyLock<String> = std::sync::LazyLock::new(|| {
    let features = [
        feature(r#""iso_a2":"US","name":"Illinois""#, &rect(-91.5, 37.0, -87.5, 42.5)),
        feature(r#""iso_a2":"US","name":"California""#, &rect(-124.4, 32.5, -114.1, 42.0)),
        feature(r#""iso_a2":"JP","name":"Tokyo""#, &rect(138.9, 35.5, 139.9, 35.9)),
        feature(r#""iso_a2":"JP","name":null"#, &rect(135.0, 34.0, 136.0, 35.0)),
    ];
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
});

pub const COUNTRY_INFO: &str = "\
# GeoNames country information
#ISO\tISO3\tISO-Numeric\tfips\tCountry\tCapital
US\tUSA\t840\tUS\tUnited States\tWashington
JP\tJPN\t392\tJA\tJapan\tTokyo
FR\tFRA\t250\tFR\tFrance\tParis
CY\tCYP\t196\tCY\tCyprus\tNicosia
DE\tDEU\t276\tGM\tGermany\tBerlin
RS\tSRB\t688\tRI\tSerbia\tBelgrade
NO\tNOR\t578\tNO\tNorway\tOslo
broken line
";

pub const ADMIN1_CODES: &str = "\
US.CA\tCalifornia\tCalifornia\t5332921
US.IL\tIllinois\tIllinois\t4896861
US.MA\tMassachusetts\tMassachusetts\t6254926
JP.40\tTokyo\tTokyo\t1850144
JP.27\tOsaka\tOsaka\t1853904
JP.99\tTokyo\tTokyo\t0
NOSEPARATOR\tBogus\tBogus\t0
DE.16\tBerlin\tBerlin\t2950157
";

pub fn city_line(name: &str, lat: &str, lon: &str, cc: &str, admin1: &str, population: &str) -> String {
    // geonameid name asciiname alternatenames lat lon fclass fcode cc cc2
    // admin1 admin2 admin3 admin4 population elevation dem timezone moddate
    format!(
        "1\t{name}\t{name}\t\t{lat}\t{lon}\tP\tPPL\t{cc}\t\t{admin1}\t\t\t\t{population}\t\t100\tEtc/UTC\t2024-01-01",
    )
}

pub fn cities_tsv() -> String {
    let rows = [
        city_line("Springfield", "39.0", "-89.0", "US", "IL", "500"),
        city_line("Chicago", "41.85003", "-87.65005", "US", "IL", "2720546"),
        city_line("Springfield", "39.80172", "-89.64371", "US", "IL", "100000"),
        city_line("Peoria", "40.69365", "-89.58899", "US", "IL", "113150"),
        city_line("Nowhere", "40.0", "-88.0", "US", "IL", ""),
        city_line("Springfield", "42.10148", "-72.58981", "US", "MA", "155929"),
        city_line("Los Angeles", "34.05223", "-118.24368", "US", "CA", "3971883"),
        city_line("Tokyo", "35.6895", "139.69171", "JP", "40", "8336599"),
        city_line("Hachioji", "35.65583", "139.32389", "JP", "40", "577513"),
        city_line("Berlin", "52.52437", "13.41053", "DE", "16", "3426354"),
        "bad\trow".to_string(),
        city_line("Broken", "abc", "1.0", "US", "IL", "10"),
    ];
    let mut text = rows.join("\n");
    text.push('\n');
    text
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Writes every fixture file into `dir` and returns a config pointing at them.
pub fn write_all(dir: &Path, with_subdivisions: bool) -> ResolverConfig {
    let boundaries = write(dir, "countries.geojson", &COUNTRIES_GEOJSON);
    let subdivisions = with_subdivisions
        .then(|| write(dir, "states.geojson", &SUBDIVISIONS_GEOJSON).to_string_lossy().into_owned());
    let country_codes = write(dir, "countryInfo.txt", COUNTRY_INFO);
    let admin1 = write(dir, "admin1CodesASCII.txt", ADMIN1_CODES);
    let cities = write(dir, "cities500.txt", &cities_tsv());

    ResolverConfig {
        boundaries: boundaries.to_string_lossy().into_owned(),
        subdivisions,
        country_codes,
        admin1: Some(admin1),
        cities: Some(cities),
        overrides: None,
        load_timeout_secs: None,
        city_radius_km: crate::config::DEFAULT_CITY_RADIUS_KM,
    }
}
