//! Shared fixtures for the Compass format tests.
//!
//! The sample text below is shaped like real Compass output: `\r\n` line
//! endings, a form feed after each survey, and a trailing soft EOF.

use crate::config::ParseConfig;
use crate::models::DatFile;

mod mak_tests;
mod writer_tests;

/// A two-survey `.DAT` file with flags, comments, and sentinel readings.
pub fn sample_dat() -> String {
    let entrance = [
        "SECRET CAVE",
        "SURVEY NAME: A",
        "SURVEY DATE: 7 10 79  COMMENT: Entrance Passage",
        "SURVEY TEAM:",
        "D.SMITH,R.BROWN,S.MURRAY",
        "DECLINATION:    1.00  FORMAT: DDDDLRUDLADN  CORRECTIONS:  0.00 0.00 0.00  CORRECTIONS2:  0.00 0.00",
        "",
        "FROM\tTO\tLENGTH\tBEARING\tINC\tLEFT\tUP\tDOWN\tRIGHT\tFLAGS\tCOMMENTS",
        "",
        "\tA1\tA2\t24.25\t15.00\t-85.00\t0.00\t0.00\t2.00\t3.50",
        "\tA2\tA3\t12.50\t235.00\t-48.00\t1.00\t1.00\t-9.90\t0.50\t#|L#\tBig Room",
        "\tA3\tA4\t10.00\t-999.00\t-90.00\t-999.00\t-999.00\t-999.00\t-999.00",
    ]
    .join("\r\n");
    let side = [
        "SECRET CAVE",
        "SURVEY NAME: B",
        "SURVEY DATE: 11 2 1981  COMMENT:",
        "SURVEY TEAM:",
        "D.SMITH",
        "DECLINATION:    1.50  FORMAT: DDDDLRUDLADN  CORRECTIONS:  0.00 0.00 0.00  CORRECTIONS2:  0.00 0.00",
        "",
        "FROM\tTO\tLENGTH\tBEARING\tINC\tLEFT\tUP\tDOWN\tRIGHT\tFLAGS\tCOMMENTS",
        "",
        "\tB1\tB2\t8.00\t90.00\t0.00\t0.50\t0.50\t0.50\t0.50\t#|PX#",
    ]
    .join("\r\n");
    format!("{entrance}\r\n\x0c\r\n{side}\r\n\x0c\r\n\x1a")
}

/// A survey block with backsight columns declared corrected.
pub fn backsight_dat() -> String {
    [
        "LECHUGUILLA",
        "SURVEY NAME: K",
        "SURVEY DATE: 3 5 2012  COMMENT: Backsight leg",
        "SURVEY TEAM:",
        "V.JONES",
        "DECLINATION:    0.00  FORMAT: DMMDLRUDLADBC  CORRECTIONS:  0.00 0.00 0.00  CORRECTIONS2:  0.00 0.00",
        "",
        "FROM\tTO\tLENGTH\tBEARING\tAZM2\tINC\tINC2\tLEFT\tUP\tDOWN\tRIGHT\tFLAGS\tCOMMENTS",
        "",
        "\tK1\tK2\t10.00\t100.00\t102.00\t5.00\t5.00\t1.00\t1.00\t1.00\t1.00",
        "\x0c\x1a",
    ]
    .join("\r\n")
}

pub fn parse_sample(content: &str) -> DatFile {
    crate::compass::parse_dat(content, "sample.dat".as_ref(), &ParseConfig::default()).unwrap()
}
