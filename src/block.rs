use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Extensions of the raster formats that can be decoded.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// Whether the path has the extension of a supported raster format.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Expands a path into image files: a directory yields its images sorted by name, any other
/// path is returned as is.
pub fn image_files(path: &Path) -> Result<Vec<PathBuf>, ContextError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path).map_err(|error| {
        ContextError::with_error(format!("Unable to list the folder {:?}", path), &error)
    })?;
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            ContextError::with_error(format!("Unable to list the folder {:?}", path), &error)
        })?;
        let entry_path = entry.path();
        if entry_path.is_file() && is_image_file(&entry_path) {
            images.push(entry_path);
        }
    }
    images.sort();

    Ok(images)
}

/// A named group of screenshots inserted together under one heading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub name: String,
    pub images: Vec<PathBuf>,
}

impl Block {
    pub fn new<S: Into<String>>(name: S, images: Vec<PathBuf>) -> Self {
        Block {
            name: name.into(),
            images,
        }
    }
}

/// The blocks of a generation run, kept in the order they were added.
///
/// Names are unique: adding a block under an existing name replaces its images and keeps its
/// position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Block>", into = "Vec<Block>")]
pub struct BlockSet {
    blocks: Vec<Block>,
}

impl BlockSet {
    pub fn new() -> Self {
        BlockSet::default()
    }

    pub fn insert(&mut self, block: Block) {
        match self
            .blocks
            .iter_mut()
            .find(|existing| existing.name == block.name)
        {
            Some(existing) => {
                log::debug!("Replacing the images of the block {:?}", block.name);
                existing.images = block.images;
            }
            None => self.blocks.push(block),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Block> {
        let index = self.blocks.iter().position(|block| block.name == name)?;
        Some(self.blocks.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every image of every block, in block order.
    pub fn images(&self) -> impl Iterator<Item = &PathBuf> {
        self.blocks.iter().flat_map(|block| block.images.iter())
    }
}

impl From<Vec<Block>> for BlockSet {
    fn from(blocks: Vec<Block>) -> Self {
        blocks.into_iter().collect()
    }
}

impl From<BlockSet> for Vec<Block> {
    fn from(block_set: BlockSet) -> Self {
        block_set.blocks
    }
}

impl FromIterator<Block> for BlockSet {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        let mut block_set = BlockSet::new();
        for block in iter {
            block_set.insert(block);
        }
        block_set
    }
}

impl<'a> IntoIterator for &'a BlockSet {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_replaces_in_place() {
        let mut blocks = BlockSet::new();
        blocks.insert(Block::new("North", vec![PathBuf::from("a.png")]));
        blocks.insert(Block::new("South", vec![PathBuf::from("b.png")]));
        blocks.insert(Block::new("North", vec![PathBuf::from("c.png")]));

        let names: Vec<&str> = blocks.iter().map(|block| block.name.as_str()).collect();
        assert_eq!(names, vec!["North", "South"]);
        assert_eq!(
            blocks.get("North").map(|block| block.images.clone()),
            Some(vec![PathBuf::from("c.png")])
        );
    }

    #[test]
    fn removed_blocks_are_gone() {
        let mut blocks: BlockSet = vec![
            Block::new("North", vec![PathBuf::from("a.png")]),
            Block::new("South", vec![PathBuf::from("b.png")]),
        ]
        .into();
        assert!(blocks.remove("North").is_some());
        assert!(blocks.remove("North").is_none());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.images().count(), 1);
    }

    #[test]
    fn folders_expand_to_their_images() {
        let folder = tempfile::tempdir().unwrap();
        for name in ["b_TIM.PNG", "a_VF.jpg", "notes.txt"] {
            std::fs::write(folder.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(folder.path().join("nested.png")).unwrap();

        let images = image_files(folder.path()).unwrap();
        assert_eq!(
            images,
            vec![folder.path().join("a_VF.jpg"), folder.path().join("b_TIM.PNG")]
        );
        assert_eq!(
            image_files(Path::new("single.gif")).unwrap(),
            vec![PathBuf::from("single.gif")]
        );
    }

    #[test]
    fn deserializes_from_a_list() {
        let blocks: BlockSet = serde_json::from_str(
            r#"[{"name": "Block1", "images": ["x.png", "y.png"]}, {"name": "Block2", "images": []}]"#,
        )
        .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks.images().count(), 2);
    }
}
