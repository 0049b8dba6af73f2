mod navigation_patches;
