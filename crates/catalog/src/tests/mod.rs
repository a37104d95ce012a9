mod catalog_flow;
