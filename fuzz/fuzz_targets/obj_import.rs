#![no_main]

use libfuzzer_sys::fuzz_target;
use rhizome_tilemesh_mesh::{export_obj, import_obj};

fuzz_target!(|data: &str| {
    // import_obj should never panic on any input
    if let Ok(mesh) = import_obj(data) {
        // anything we accept must survive an export and re-import
        let reimported = import_obj(&export_obj(&mesh));
        assert!(reimported.is_ok());
    }
});
