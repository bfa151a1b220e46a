//! Generates Swift and Kotlin bindings for `keyshelf-core`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
