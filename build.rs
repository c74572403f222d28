#[cfg(genproto)]
extern crate prost_build;

#[cfg(genproto)]
use std::{env, fs, io::Write, path::Path};

#[cfg(genproto)]
const GENERATED_HEADER: &str =
    "// Generated by build.rs (`RUSTFLAGS=\"--cfg genproto\" cargo build`) from proto/node.proto.\n// Checked in so a normal build does not require protoc.\n\n";

/// To regenerate `src/rpc/pb.rs` from `proto/node.proto`, run
/// `RUSTFLAGS="--cfg genproto" cargo build`.
fn main() {
    #[cfg(genproto)]
    generate_protos();
}

#[cfg(genproto)]
fn generate_protos() {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]")
        .out_dir(env::var("OUT_DIR").unwrap())
        .compile(&["proto/node.proto"], &["proto/"])
        .expect("protobuf compilation failed");

    let out_dir = env::var("OUT_DIR").unwrap();
    let from_path = Path::new(&out_dir).join("regolancer.rs");
    let content = fs::read(&from_path).unwrap();
    let mut dest = fs::File::create(Path::new("src/rpc").join("pb.rs")).unwrap();
    dest.write_all(GENERATED_HEADER.as_bytes()).unwrap();
    dest.write_all(&content).unwrap();
}
