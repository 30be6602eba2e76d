//! Code for reading interconnectors and their transfer capacities.
use super::*;
use crate::ntc::{Direction, Link, LinkID, LinkMap, NtcObservation};
use crate::unit::RegionID;
use crate::units::Capacity;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const LINKS_FILE_NAME: &str = "links.csv";
const NTC_FILE_NAME: &str = "ntc.csv";

#[derive(Debug, Deserialize, PartialEq)]
struct LinkRaw {
    id: String,
    from_region: String,
    to_region: String,
    symmetric: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
struct NtcObservationRaw {
    link_id: String,
    direction: Direction,
    year: u32,
    #[serde(deserialize_with = "deserialise_non_negative")]
    capacity_mw: f64,
}

/// Read interconnectors and NTC observations, if given.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario files
pub fn read_links(scenario_dir: &Path) -> Result<(LinkMap, Vec<NtcObservation>)> {
    let file_path = scenario_dir.join(LINKS_FILE_NAME);
    let links_csv = read_csv_optional(&file_path)?;
    let links = read_links_from_iter(links_csv).with_context(|| input_err_msg(&file_path))?;

    let file_path = scenario_dir.join(NTC_FILE_NAME);
    let observations_csv = read_csv_optional(&file_path)?;
    let observations = read_ntc_observations_from_iter(observations_csv, &links)
        .with_context(|| input_err_msg(&file_path))?;

    Ok((links, observations))
}

fn read_links_from_iter<I>(iter: I) -> Result<LinkMap>
where
    I: Iterator<Item = LinkRaw>,
{
    let mut links = LinkMap::new();
    for row in iter {
        ensure!(
            row.from_region != row.to_region,
            "Link {} must connect two different regions",
            row.id
        );

        let link = Link {
            id: LinkID::from(row.id),
            from_region: RegionID::from(row.from_region),
            to_region: RegionID::from(row.to_region),
            symmetric: row.symmetric,
        };
        let id = link.id.clone();
        ensure!(
            links.insert(id.clone(), link).is_none(),
            "Duplicate link ID: {id}"
        );
    }

    Ok(links)
}

fn read_ntc_observations_from_iter<I>(iter: I, links: &LinkMap) -> Result<Vec<NtcObservation>>
where
    I: Iterator<Item = NtcObservationRaw>,
{
    let mut seen = HashSet::new();
    let mut observations = Vec::new();
    for row in iter {
        let (id, link) = links
            .get_key_value(row.link_id.as_str())
            .with_context(|| format!("Unknown link ID: {}", row.link_id))?;
        ensure!(
            !(link.symmetric && row.direction == Direction::Backward),
            "Link {id} is symmetric, so only forward capacities may be given"
        );
        ensure!(
            seen.insert((id.clone(), row.direction, row.year)),
            "Duplicate NTC observation for link {id} ({}) in {}",
            row.direction,
            row.year
        );

        observations.push(NtcObservation {
            link_id: id.clone(),
            direction: row.direction,
            year: row.year,
            capacity: Capacity(row.capacity_mw),
        });
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::{fixture, rstest};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn link(id: &str, from_region: &str, to_region: &str, symmetric: bool) -> LinkRaw {
        LinkRaw {
            id: id.into(),
            from_region: from_region.into(),
            to_region: to_region.into(),
            symmetric,
        }
    }

    fn observation(link_id: &str, direction: Direction, year: u32) -> NtcObservationRaw {
        NtcObservationRaw {
            link_id: link_id.into(),
            direction,
            year,
            capacity_mw: 100.0,
        }
    }

    #[fixture]
    fn links() -> LinkMap {
        read_links_from_iter(
            [
                link("DE-FR", "DE", "FR", true),
                link("DE-PL", "DE", "PL", false),
            ]
            .into_iter(),
        )
        .unwrap()
    }

    #[test]
    fn test_read_links() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(LINKS_FILE_NAME)).unwrap();
            writeln!(file, "id,from_region,to_region,symmetric\nDE-FR,DE,FR,true").unwrap();
            let mut file = File::create(dir.path().join(NTC_FILE_NAME)).unwrap();
            writeln!(
                file,
                "link_id,direction,year,capacity_mw\nDE-FR,forward,2020,3000"
            )
            .unwrap();
        }

        let (links, observations) = read_links(dir.path()).unwrap();
        assert_eq!(
            links["DE-FR"],
            Link {
                id: "DE-FR".into(),
                from_region: "DE".into(),
                to_region: "FR".into(),
                symmetric: true,
            }
        );
        assert_eq!(
            observations,
            [NtcObservation {
                link_id: "DE-FR".into(),
                direction: Direction::Forward,
                year: 2020,
                capacity: Capacity(3000.0),
            }]
        );
    }

    #[test]
    fn test_read_links_missing_files() {
        let dir = tempdir().unwrap();
        let (links, observations) = read_links(dir.path()).unwrap();
        assert!(links.is_empty());
        assert!(observations.is_empty());
    }

    #[rstest]
    #[case(link("DE-DE", "DE", "DE", false), "Link DE-DE must connect two different regions")]
    #[case(link("DE-FR", "DE", "FR", true), "Duplicate link ID: DE-FR")]
    fn test_read_links_from_iter_invalid(#[case] second: LinkRaw, #[case] msg: &str) {
        let rows = [link("DE-FR", "DE", "FR", false), second];
        assert_error!(read_links_from_iter(rows.into_iter()), msg);
    }

    #[rstest]
    #[case(vec![observation("DE-XX", Direction::Forward, 2020)], "Unknown link ID: DE-XX")]
    #[case(
        vec![observation("DE-FR", Direction::Backward, 2020)],
        "Link DE-FR is symmetric, so only forward capacities may be given"
    )]
    #[case(
        vec![
            observation("DE-PL", Direction::Backward, 2020),
            observation("DE-PL", Direction::Backward, 2020)
        ],
        "Duplicate NTC observation for link DE-PL (backward) in 2020"
    )]
    fn test_read_ntc_observations_from_iter_invalid(
        links: LinkMap,
        #[case] rows: Vec<NtcObservationRaw>,
        #[case] msg: &str,
    ) {
        assert_error!(
            read_ntc_observations_from_iter(rows.into_iter(), &links),
            msg
        );
    }

    #[test]
    fn test_read_ntc_observations_negative() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(NTC_FILE_NAME);
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "link_id,direction,year,capacity_mw\nDE-FR,forward,2020,-1").unwrap();
        }
        assert!(read_csv::<NtcObservationRaw>(&file_path).is_err());
    }
}
