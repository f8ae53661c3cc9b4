use std::borrow::Cow;

use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use ordinals_index_did::keys::{InscriptionId, LocationOrderKey};

const ID_SIZE: usize = 36;
const ORDER_SIZE: usize = 16;

/// Location of one inscription, ordered by inscription first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LocationKey {
    pub inscription: InscriptionId,
    pub order: LocationOrderKey,
}

impl LocationKey {
    pub fn new(inscription: InscriptionId, order: LocationOrderKey) -> Self {
        Self { inscription, order }
    }

    /// Lowest key of the given inscription chain.
    pub fn chain_start(inscription: InscriptionId) -> Self {
        Self::new(inscription, LocationOrderKey::default())
    }

    /// Highest key of the given inscription chain.
    pub fn chain_end(inscription: InscriptionId) -> Self {
        Self::new(inscription, LocationOrderKey::MAX)
    }
}

impl Storable for LocationKey {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buff = Vec::with_capacity(Self::BOUND.max_size() as usize);
        buff.extend_from_slice(&self.inscription.to_bytes());
        buff.extend_from_slice(&self.order.to_bytes());

        buff.into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Self {
            inscription: InscriptionId::from_bytes(Cow::Borrowed(&bytes[..ID_SIZE])),
            order: LocationOrderKey::from_bytes(Cow::Borrowed(&bytes[ID_SIZE..])),
        }
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: (ID_SIZE + ORDER_SIZE) as u32,
        is_fixed_size: true,
    };
}

/// Location of one inscription, ordered by block position first.
///
/// Used to find everything a rollback has to remove and every transfer of a block.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BlockLocationKey {
    pub order: LocationOrderKey,
    pub inscription: InscriptionId,
}

impl BlockLocationKey {
    pub fn new(order: LocationOrderKey, inscription: InscriptionId) -> Self {
        Self { order, inscription }
    }

    /// Lowest key of the given block.
    pub fn block_start(block_height: u64) -> Self {
        Self::new(
            LocationOrderKey::block_start(block_height),
            InscriptionId::min(),
        )
    }

    pub fn location_key(&self) -> LocationKey {
        LocationKey::new(self.inscription, self.order)
    }
}

impl Storable for BlockLocationKey {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buff = Vec::with_capacity(Self::BOUND.max_size() as usize);
        buff.extend_from_slice(&self.order.to_bytes());
        buff.extend_from_slice(&self.inscription.to_bytes());

        buff.into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Self {
            order: LocationOrderKey::from_bytes(Cow::Borrowed(&bytes[..ORDER_SIZE])),
            inscription: InscriptionId::from_bytes(Cow::Borrowed(&bytes[ORDER_SIZE..])),
        }
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: (ID_SIZE + ORDER_SIZE) as u32,
        is_fixed_size: true,
    };
}
