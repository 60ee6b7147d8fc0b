pub mod checksum;
pub mod compositor;
pub mod html;
pub mod labeler;
pub mod manifest;
pub mod pinyin;
pub mod poem;
pub mod translate;
