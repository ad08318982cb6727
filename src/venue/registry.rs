//! The closed, static venue catalog.

use super::{ListingStrategy, QueryDimension, VenueDescriptor, VenueId};

const DBLP_ROOT: &str = "https://dblp.org/db";
const CVF_ROOT: &str = "https://openaccess.thecvf.com";
const ECVA_ROOT: &str = "https://www.ecva.net";
const JMLR_ROOT: &str = "https://jmlr.org";

const fn dblp_conference(id: VenueId, name: &'static str) -> VenueDescriptor {
    VenueDescriptor {
        id,
        name,
        dimension: QueryDimension::Year,
        strategy: ListingStrategy::Dblp,
        base_url: DBLP_ROOT,
        first_year: None,
        aliases: &[],
    }
}

static REGISTRY: [VenueDescriptor; 20] = [
    // Operating systems and storage
    dblp_conference(VenueId::Fast, "FAST"),
    dblp_conference(VenueId::Osdi, "OSDI"),
    dblp_conference(VenueId::Atc, "USENIX ATC"),
    // Networking
    dblp_conference(VenueId::Nsdi, "NSDI"),
    // Security
    dblp_conference(VenueId::Uss, "USENIX Security"),
    dblp_conference(VenueId::Ndss, "NDSS"),
    // Artificial intelligence
    dblp_conference(VenueId::Aaai, "AAAI"),
    dblp_conference(VenueId::Ijcai, "IJCAI"),
    // Computer vision
    VenueDescriptor {
        id: VenueId::Cvpr,
        name: "CVPR",
        dimension: QueryDimension::Year,
        strategy: ListingStrategy::CvfOpenAccess,
        base_url: CVF_ROOT,
        first_year: None,
        aliases: &[],
    },
    VenueDescriptor {
        id: VenueId::Iccv,
        name: "ICCV",
        dimension: QueryDimension::Year,
        strategy: ListingStrategy::CvfOpenAccess,
        base_url: CVF_ROOT,
        first_year: None,
        aliases: &[],
    },
    VenueDescriptor {
        id: VenueId::Eccv,
        name: "ECCV",
        dimension: QueryDimension::Year,
        strategy: ListingStrategy::Ecva,
        base_url: ECVA_ROOT,
        first_year: Some(2018),
        aliases: &[],
    },
    // Machine learning
    dblp_conference(VenueId::Iclr, "ICLR"),
    VenueDescriptor {
        first_year: Some(2010),
        ..dblp_conference(VenueId::Icml, "ICML")
    },
    VenueDescriptor {
        aliases: &["nips"],
        ..dblp_conference(VenueId::Neurips, "NeurIPS")
    },
    // Natural language processing
    dblp_conference(VenueId::Acl, "ACL"),
    dblp_conference(VenueId::Emnlp, "EMNLP"),
    dblp_conference(VenueId::Naacl, "NAACL"),
    // Robotics
    dblp_conference(VenueId::Rss, "RSS"),
    // Journals
    VenueDescriptor {
        id: VenueId::Pvldb,
        name: "PVLDB",
        dimension: QueryDimension::Volume,
        strategy: ListingStrategy::Dblp,
        base_url: DBLP_ROOT,
        first_year: None,
        aliases: &[],
    },
    VenueDescriptor {
        id: VenueId::Jmlr,
        name: "JMLR",
        dimension: QueryDimension::Volume,
        strategy: ListingStrategy::Jmlr,
        base_url: JMLR_ROOT,
        first_year: None,
        aliases: &[],
    },
];

/// All venues in catalog order.
#[must_use]
pub fn all_venues() -> &'static [VenueDescriptor] {
    &REGISTRY
}

/// Finds a venue by identifier or alias, ignoring case.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static VenueDescriptor> {
    let name = name.trim();
    REGISTRY.iter().find(|descriptor| {
        descriptor.id.as_str().eq_ignore_ascii_case(name)
            || descriptor
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

pub(super) fn descriptor(id: VenueId) -> &'static VenueDescriptor {
    // Every VenueId has exactly one entry; the fallback is unreachable.
    REGISTRY
        .iter()
        .find(|descriptor| descriptor.id == id)
        .unwrap_or(&REGISTRY[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_has_one_descriptor() {
        for descriptor in all_venues() {
            let matches = all_venues()
                .iter()
                .filter(|other| other.id == descriptor.id)
                .count();
            assert_eq!(matches, 1, "duplicate entry for {}", descriptor.id);
            assert_eq!(super::descriptor(descriptor.id).id, descriptor.id);
        }
    }

    #[test]
    fn test_lookup_resolves_alias() {
        let descriptor = lookup(" NIPS ").map(|d| d.id);
        assert_eq!(descriptor, Some(VenueId::Neurips));
    }

    #[test]
    fn test_journals_are_volume_indexed() {
        let journals: Vec<_> = all_venues()
            .iter()
            .filter(|d| d.dimension == QueryDimension::Volume)
            .map(|d| d.id)
            .collect();
        assert_eq!(journals, vec![VenueId::Pvldb, VenueId::Jmlr]);
    }
}
