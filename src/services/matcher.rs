use crate::models::{InstanceType, MatchedInstance, Requirement};
use std::cmp::Ordering;

pub fn fits(instance: &InstanceType, requirement: &Requirement) -> bool {
    instance.vcpus >= requirement.cpu_cores && instance.memory_gb >= requirement.ram_gb
}

/// Fewest vCPUs first, then least memory; the name settles exact ties so the
/// choice does not depend on catalog order.
fn preference(a: &InstanceType, b: &InstanceType) -> Ordering {
    a.vcpus
        .cmp(&b.vcpus)
        .then(a.memory_gb.cmp(&b.memory_gb))
        .then_with(|| a.name.cmp(&b.name))
}

/// Smallest instance that satisfies both CPU and memory of `requirement`.
pub fn select_instance<'a>(
    requirement: &Requirement,
    catalog: &'a [InstanceType],
) -> Option<&'a InstanceType> {
    catalog
        .iter()
        .filter(|instance| fits(instance, requirement))
        .min_by(|a, b| preference(a, b))
}

/// One match per satisfiable requirement, in input order. Requirements no
/// instance can hold are left out.
pub fn find_best_matches(
    requirements: &[Requirement],
    catalog: &[InstanceType],
) -> Vec<MatchedInstance> {
    if requirements.is_empty() || catalog.is_empty() {
        tracing::warn!(
            requirements = requirements.len(),
            instance_types = catalog.len(),
            "Empty requirements or instance catalog"
        );
        return Vec::new();
    }

    requirements
        .iter()
        .filter_map(|requirement| match select_instance(requirement, catalog) {
            Some(instance) => Some(MatchedInstance {
                server_name: requirement.server_name.clone(),
                cpu: instance.vcpus,
                ram: instance.memory_gb,
                instance_type: instance.name.clone(),
                storage: requirement.storage.clone(),
                database: requirement.database.clone(),
            }),
            None => {
                tracing::info!(
                    server = %requirement.server_name,
                    cpu = requirement.cpu_cores,
                    ram_gb = requirement.ram_gb,
                    "No instance type satisfies requirement"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, vcpus: u32, memory_gb: u32) -> InstanceType {
        InstanceType {
            name: name.to_string(),
            vcpus,
            memory_gb,
        }
    }

    fn requirement(cpu_cores: u32, ram_gb: u32) -> Requirement {
        Requirement {
            server_name: format!("srv-{cpu_cores}-{ram_gb}"),
            cpu_cores,
            ram_gb,
            storage: "100GB SSD".to_string(),
            database: "None".to_string(),
        }
    }

    #[test]
    fn test_exact_fit_wins() {
        let catalog = vec![instance("a", 2, 4), instance("b", 4, 8), instance("c", 4, 4)];
        let matched = find_best_matches(&[requirement(2, 4)], &catalog);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].instance_type, "a");
        assert_eq!((matched[0].cpu, matched[0].ram), (2, 4));
    }

    #[test]
    fn test_fewer_vcpus_beat_less_memory() {
        // c5 has less memory than r5 but more vCPUs; vCPUs decide first.
        let catalog = vec![instance("c5", 8, 16), instance("r5", 4, 32)];
        let chosen = select_instance(&requirement(4, 16), &catalog).unwrap();
        assert_eq!(chosen.name, "r5");
    }

    #[test]
    fn test_memory_breaks_vcpu_ties() {
        let catalog = vec![instance("m5", 4, 16), instance("c5", 4, 8), instance("r5", 4, 32)];
        let chosen = select_instance(&requirement(4, 8), &catalog).unwrap();
        assert_eq!(chosen.name, "c5");
    }

    #[test]
    fn test_selection_ignores_catalog_order() {
        let mut catalog = vec![instance("b", 2, 4), instance("a", 2, 4), instance("c", 8, 8)];
        let first = select_instance(&requirement(1, 1), &catalog).unwrap().name.clone();
        catalog.reverse();
        let second = select_instance(&requirement(1, 1), &catalog).unwrap().name.clone();
        assert_eq!(first, "a");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsatisfiable_requirement_is_omitted() {
        let catalog = vec![instance("small", 2, 4)];
        let matched = find_best_matches(&[requirement(64, 512), requirement(2, 2)], &catalog);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].server_name, "srv-2-2");
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        assert!(find_best_matches(&[], &[instance("a", 2, 4)]).is_empty());
        assert!(find_best_matches(&[requirement(1, 1)], &[]).is_empty());
    }

    #[test]
    fn test_match_never_undersized() {
        let catalog: Vec<InstanceType> = [1u32, 2, 4, 8, 16, 32]
            .iter()
            .flat_map(|&vcpus| {
                [1u32, 2, 4, 8, 16, 32, 64, 128]
                    .iter()
                    .map(move |&mem| instance(&format!("i{vcpus}x{mem}"), vcpus, mem))
            })
            .collect();

        for cpu in 1..=40 {
            for ram in (1..=140).step_by(7) {
                let req = requirement(cpu, ram);
                match select_instance(&req, &catalog) {
                    Some(chosen) => {
                        assert!(chosen.vcpus >= cpu && chosen.memory_gb >= ram);
                        let smaller_exists = catalog.iter().any(|other| {
                            fits(other, &req) && preference(other, chosen) == Ordering::Less
                        });
                        assert!(!smaller_exists);
                    }
                    None => assert!(!catalog.iter().any(|i| fits(i, &req))),
                }
            }
        }
    }
}
