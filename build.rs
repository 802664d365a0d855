fn main() {
    built::write_built_file().expect("Failed to write build metadata");
}
