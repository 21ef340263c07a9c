pub mod asset_service;
pub mod assembly_service;
pub mod delete_service;
pub mod fetch_service;
pub mod pack_repository;
pub mod update_service;

pub use assembly_service::{assemble_pack, assemble_pack_async, AssembledPack, AssemblyRequest, StagedSticker};
pub use delete_service::{delete_pack, remove_invalid_stickers};
pub use fetch_service::{load_and_validate_packs, reap_orphaned_directories, PackListing, WhitelistCheck};
pub use update_service::{clear_invalid_links, rename_pack};
