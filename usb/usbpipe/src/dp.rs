//! Descriptor parser.
//!
//! A configuration descriptor is a flat stream of descriptors, each starting with its own length
//! (bLength) and type (bDescriptorType). The tree structure is implicit: an endpoint belongs to
//! the interface descriptor before it, a HID report descriptor to the HID descriptor before it,
//! and so on. Which type may nest under which is not encoded in the stream, so the parser is
//! driven by a table of [DescriptorNesting] pairs.
use std::fmt;

use plain::Plain;

use crate::usb::DescriptorKind;

/// One allowed parent/child relationship between descriptor types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DescriptorNesting {
    pub parent: u8,
    pub child: u8,
}

impl DescriptorNesting {
    pub const fn new(parent: DescriptorKind, child: DescriptorKind) -> Self {
        Self {
            parent: parent as u8,
            child: child as u8,
        }
    }
}

/// Nesting of the standard descriptors found in a configuration descriptor.
pub const STANDARD_NESTING: &[DescriptorNesting] = &[
    DescriptorNesting::new(DescriptorKind::Configuration, DescriptorKind::Interface),
    DescriptorNesting::new(DescriptorKind::Interface, DescriptorKind::Endpoint),
    DescriptorNesting::new(DescriptorKind::Interface, DescriptorKind::Hub),
    DescriptorNesting::new(DescriptorKind::Interface, DescriptorKind::Hid),
    DescriptorNesting::new(DescriptorKind::Hid, DescriptorKind::HidReport),
];

/// Shortest possible descriptor: just bLength and bDescriptorType.
const DESCRIPTOR_HEADER_LEN: usize = 2;

/// A single descriptor inside a descriptor buffer.
///
/// `bytes` starts at the descriptor and is cut off at either its declared length or the end of
/// the buffer, whichever comes first.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Descriptor<'a> {
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> Descriptor<'a> {
    fn at(data: &'a [u8], offset: usize) -> Option<Self> {
        let header = data.get(offset..offset.checked_add(DESCRIPTOR_HEADER_LEN)?)?;
        let end = (offset + usize::from(header[0])).min(data.len());

        Some(Self {
            offset,
            bytes: &data[offset..end.max(offset + DESCRIPTOR_HEADER_LEN)],
        })
    }

    /// Position of the descriptor within the buffer it was found in.
    pub fn offset(&self) -> usize {
        self.offset
    }
    /// The declared length, bLength.
    pub fn length(&self) -> u8 {
        self.bytes[0]
    }
    /// The descriptor type, bDescriptorType.
    pub fn kind(&self) -> u8 {
        self.bytes[1]
    }
    pub fn is(&self, kind: DescriptorKind) -> bool {
        self.kind() == kind as u8
    }
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
    /// Reinterprets the descriptor as `T`, if enough bytes are present.
    pub fn parse<T: Plain>(&self) -> Option<&'a T> {
        plain::from_bytes(self.bytes).ok()
    }
}

impl fmt::Debug for Descriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("offset", &self.offset)
            .field("length", &self.length())
            .field("kind", &format_args!("{:#04x}", self.kind()))
            .finish()
    }
}

/// A descriptor buffer together with the nesting rules used to walk it.
#[derive(Clone, Copy)]
pub struct DescriptorTree<'a> {
    data: &'a [u8],
    nesting: &'a [DescriptorNesting],
}

impl<'a> DescriptorTree<'a> {
    pub fn new(data: &'a [u8], nesting: &'a [DescriptorNesting]) -> Self {
        Self { data, nesting }
    }

    /// A tree over `data` using [STANDARD_NESTING].
    pub fn standard(data: &'a [u8]) -> Self {
        Self::new(data, STANDARD_NESTING)
    }

    /// The descriptor at the start of the buffer.
    pub fn root(&self) -> Option<Descriptor<'a>> {
        Descriptor::at(self.data, 0)
    }

    fn is_nested_kind(&self, child: u8, parent: u8) -> bool {
        self.nesting
            .iter()
            .any(|nesting| nesting.child == child && nesting.parent == parent)
    }

    fn is_nested(&self, child: &Descriptor<'_>, parent: &Descriptor<'_>) -> bool {
        self.is_nested_kind(child.kind(), parent.kind())
    }

    /// The descriptor following `current` in the buffer, regardless of nesting.
    fn next(&self, current: &Descriptor<'a>) -> Option<Descriptor<'a>> {
        let length = usize::from(current.length());
        // A descriptor shorter than its own header would make us revisit it forever.
        if length < DESCRIPTOR_HEADER_LEN {
            return None;
        }
        Descriptor::at(self.data, current.offset + length)
    }

    /// The first descriptor nested directly below `parent`.
    pub fn nested(&self, parent: &Descriptor<'a>) -> Option<Descriptor<'a>> {
        let next = self.next(parent)?;
        if self.is_nested(&next, parent) {
            Some(next)
        } else {
            None
        }
    }

    /// The first descriptor after `parent` and everything nested below it.
    fn skip_nested(&self, parent: &Descriptor<'a>) -> Option<Descriptor<'a>> {
        let child = match self.nested(parent) {
            Some(child) => child,
            None => return self.next(parent),
        };

        let mut next_child = self.skip_nested(&child);
        while let Some(candidate) = next_child {
            if !self.is_nested(&candidate, parent) {
                break;
            }
            next_child = self.skip_nested(&candidate);
        }
        next_child
    }

    /// The descriptor after `current` that is nested directly below the same `parent`.
    pub fn sibling(
        &self,
        parent: &Descriptor<'a>,
        current: &Descriptor<'a>,
    ) -> Option<Descriptor<'a>> {
        let possible_sibling = self.skip_nested(current)?;
        if self.is_nested(&possible_sibling, parent) {
            Some(possible_sibling)
        } else {
            None
        }
    }

    /// Iterates over the descriptors nested directly below `parent`.
    pub fn children(&self, parent: Descriptor<'a>) -> Children<'a> {
        Children {
            tree: *self,
            parent,
            next: self.nested(&parent),
        }
    }

    /// Visits every descriptor reachable from the root, parents before children, together with
    /// its depth (the root is at depth 0).
    pub fn walk<F: FnMut(Descriptor<'a>, usize)>(&self, mut callback: F) {
        if let Some(root) = self.root() {
            self.browse(root, 0, &mut callback);
        }
    }

    fn browse<F: FnMut(Descriptor<'a>, usize)>(
        &self,
        root: Descriptor<'a>,
        depth: usize,
        callback: &mut F,
    ) {
        callback(root, depth);

        let mut child = self.nested(&root);
        while let Some(current) = child {
            self.browse(current, depth + 1, callback);
            child = self.sibling(&root, &current);
        }
    }
}

pub struct Children<'a> {
    tree: DescriptorTree<'a>,
    parent: Descriptor<'a>,
    next: Option<Descriptor<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.tree.sibling(&self.parent, &current);
        Some(current)
    }
}
