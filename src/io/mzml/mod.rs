/// Spectrum metadata of indexed mzML files
pub mod spectrum_scanner;
