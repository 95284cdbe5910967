use parsing::mca::parse_mca_db;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// the machine check tables are parsed at compile time and stored as perfect hash maps,
// so a lookup never has to touch the parser
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../parsing/src/mca/input.txt");

    let db = parse_mca_db().expect("failed to parse the machine check database");
    let dangling = db.dangling_banks();
    assert!(
        dangling.is_empty(),
        "banks {dangling:?} are assigned to blocks that are not defined"
    );

    let mut blocks = phf_codegen::Map::new();
    for block in &db.blocks {
        let errors: Vec<String> = block
            .errors
            .iter()
            .map(|e| {
                format!(
                    "ErrorEntry {{ code: {}, acronym: {:?}, description: {:?} }}",
                    e.code, e.acronym, e.description
                )
            })
            .collect();
        blocks.entry(
            block.acronym.as_str(),
            &format!(
                "BlockEntry {{ acronym: {:?}, description: {:?}, errors: &[{}] }}",
                block.acronym,
                block.description,
                errors.join(", ")
            ),
        );
    }

    let mut banks = phf_codegen::Map::new();
    for (bank, acronym) in &db.banks {
        banks.entry(*bank, &format!("{acronym:?}"));
    }

    let path = Path::new(&env::var("OUT_DIR").unwrap()).join("mca_codegen.rs");
    let mut file = BufWriter::new(File::create(path).unwrap());
    writeln!(
        &mut file,
        "pub static BLOCKS: phf::Map<&'static str, BlockEntry> = {};",
        blocks.build()
    )
    .unwrap();
    writeln!(
        &mut file,
        "pub static BANKS: phf::Map<u8, &'static str> = {};",
        banks.build()
    )
    .unwrap();
}
