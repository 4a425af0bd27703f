fn main() {
    // Exposes package metadata (version, target, profile) as `built_info`.
    built::write_built_file().expect("Failed to generate build info");
}
