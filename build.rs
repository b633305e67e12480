fn main() {
    // Generates OUT_DIR/built.rs with build metadata (git commit, versions).
    built::write_built_file().expect("Failed to acquire build-time information");
}
