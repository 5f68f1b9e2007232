/// Reader for the tab separated FLASHTagger result files
pub mod flash_tsv;
/// IO for reading spectrum metadata from mzML files
pub mod mzml;
