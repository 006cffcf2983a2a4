mod create_cluster;
mod get_list_upgrade;
mod node_group_lifecycle;
