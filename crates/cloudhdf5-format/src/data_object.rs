//! Interpretation of an object header's messages into a typed view of
//! the object: dataset metadata, group storage, and attributes.

use crate::attribute::AttributeMessage;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::fill_value::FillValue;
use crate::filter_pipeline::FilterPipeline;
use crate::link_info::LinkInfoMessage;
use crate::link_message::LinkMessage;
use crate::message_type::MessageType;
use crate::object_header::ObjectHeader;
use crate::source::ByteSource;
use crate::superblock::Superblock;
use crate::symbol_table::SymbolTableMessage;

/// A fully interpreted HDF5 object.
///
/// Objects are immutable on disk, so a parsed `DataObject` can be memoized
/// by address and shared freely.
#[derive(Debug, Clone)]
pub struct DataObject {
    /// File address of the object header.
    pub address: u64,
    /// Dataspace, present on datasets and attribute-bearing objects.
    pub dataspace: Option<Dataspace>,
    /// Datatype, present on datasets.
    pub datatype: Option<Datatype>,
    /// Declared fill value.
    pub fill_value: Option<FillValue>,
    /// Data layout, present on datasets.
    pub layout: Option<DataLayout>,
    /// Filter pipeline for chunked data.
    pub pipeline: Option<FilterPipeline>,
    /// Attributes attached to this object.
    pub attributes: Vec<AttributeMessage>,
    /// Old-style group storage (B-tree + local heap).
    pub symbol_table: Option<SymbolTableMessage>,
    /// New-style group link info (fractal heap / name index).
    pub link_info: Option<LinkInfoMessage>,
    /// Inline link messages of a new-style group.
    pub links: Vec<LinkMessage>,
}

impl DataObject {
    /// Parse the object header at `address` and interpret its messages.
    pub fn parse(
        src: &dyn ByteSource,
        address: u64,
        superblock: &Superblock,
    ) -> Result<DataObject, FormatError> {
        let header = ObjectHeader::parse(
            src,
            address,
            superblock.offset_size,
            superblock.length_size,
        )?;
        Self::from_header(&header, address, superblock)
    }

    /// Interpret an already parsed object header.
    pub fn from_header(
        header: &ObjectHeader,
        address: u64,
        superblock: &Superblock,
    ) -> Result<DataObject, FormatError> {
        let os = superblock.offset_size;
        let ls = superblock.length_size;

        let mut object = DataObject {
            address,
            dataspace: None,
            datatype: None,
            fill_value: None,
            layout: None,
            pipeline: None,
            attributes: Vec::new(),
            symbol_table: None,
            link_info: None,
            links: Vec::new(),
        };

        for msg in &header.messages {
            match msg.msg_type {
                MessageType::Dataspace => {
                    object.dataspace = Some(Dataspace::parse(&msg.data, ls)?);
                }
                MessageType::Datatype => {
                    let (dt, _) = Datatype::parse(&msg.data)?;
                    object.datatype = Some(dt);
                }
                MessageType::FillValue => {
                    object.fill_value = Some(FillValue::parse(&msg.data)?);
                }
                MessageType::DataLayout => {
                    object.layout = Some(DataLayout::parse(&msg.data, os, ls)?);
                }
                MessageType::FilterPipeline => {
                    object.pipeline = Some(FilterPipeline::parse(&msg.data)?);
                }
                MessageType::Attribute => {
                    object.attributes.push(AttributeMessage::parse(&msg.data, ls)?);
                }
                MessageType::SymbolTable => {
                    object.symbol_table = Some(SymbolTableMessage::parse(&msg.data, os)?);
                }
                MessageType::LinkInfo => {
                    object.link_info = Some(LinkInfoMessage::parse(&msg.data, os)?);
                }
                MessageType::Link => {
                    let (link, _) = LinkMessage::parse(&msg.data, os)?;
                    object.links.push(link);
                }
                // fill value (old), group info, modification time,
                // attribute info: recognized but not needed for reading
                _ => {}
            }
        }

        Ok(object)
    }

    /// Whether this object is a dataset.
    pub fn is_dataset(&self) -> bool {
        self.layout.is_some()
    }

    /// Whether this object can act as a group.
    pub fn is_group(&self) -> bool {
        self.symbol_table.is_some() || self.link_info.is_some() || !self.links.is_empty()
    }

    /// Find an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeMessage> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
