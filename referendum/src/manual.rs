/*!

This is the long-form manual for `referendum` and `refmap`.

## Input files

Four files describe a referendum:

* the ballot file, separated by semicolons, with one line per town (or any
  finer unit). The columns `Department code`, `Registered`, `Abstentions`,
  `Null`, `Choice A` and `Choice B` are required, the others are ignored.
* the region file, separated by commas, with the columns `code` and `name`.
* the department file, separated by commas, with the columns `code`, `name`
  and `region_code`.
* a GeoJSON `FeatureCollection` with the boundary of each region. The region
  name is read from the `nom` property of each feature (configurable).
  `Polygon` and `MultiPolygon` geometries are supported.

A file missing one of the required columns is rejected before anything is
computed. A ballot line with an empty cell is dropped (and reported in the
logs), while a cell that is not a number stops the run. Blank cells of the
region and department files leave the matching departments without ballots.

## Processing

1. Each department gets the code and name of its region. A department whose
   region is unknown is kept, without region.
2. The department codes of the ballot file are padded to two characters
   (`1` becomes `01`, `2A` and `971` are kept). The departments of the
   overseas regions (`DOM`, `TOM`, `COM`) are removed, then each ballot line
   is matched to its department. Lines that do not match a department with a
   known region are dropped and listed in the logs.
3. The counts are summed by region.
4. Each region is matched to its boundary *by name*. The name must be written
   exactly the same way in the region file and in the boundary file (accents
   and case included). The ratio `Choice A / (Choice A + Choice B)` is computed
   for each region; it is undefined for a region without expressed ballot.

## Running `refmap`

```bash
refmap --config referendum.json --svg map.svg --out stdout
```

The configuration file lists the input files, relative to its own location:

```json
{
  "outputSettings": { "contestName": "Referendum" },
  "sources": {
    "ballotsPath": "referendum.csv",
    "regionsPath": "regions.csv",
    "departmentsPath": "departments.csv",
    "geometryPath": "regions.geojson"
  }
}
```

The four files can also be given directly with `--ballots`, `--regions`,
`--departments` and `--geometry`. The option `--reference` compares the
computed summary with a previous one and fails if they differ.

*/
